//! Gem resolution for embedding.

mod closure;
mod index;

pub use closure::closure;
pub use index::{GemIndex, GemSpec, GemVersion, InstalledGems};

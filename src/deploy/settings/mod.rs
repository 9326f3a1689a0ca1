//! Configuration structures for deployment runs.
//!
//! [`Settings`] is computed once at the start of a run and passed by
//! reference to every step; nothing in the engine caches state of its own.

mod arch;
mod builder;
mod core;
mod layout;

pub use arch::ArchitectureSet;
pub use builder::{DEFAULT_FRAMEWORKS_DIR, SettingsBuilder};
pub use self::core::{Settings, StdlibSelection};
pub use layout::RuntimeLayout;

//! Runtime framework deployer for macOS application bundles.
//!
//! Embeds an installed runtime framework into an `.app` bundle, optionally
//! compiling its sources first, so that the application runs on machines
//! without the framework installed.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod deploy;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, DeployError, Result};

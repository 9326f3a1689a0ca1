//! Top-level error types for the command line tool.
//!
//! Engine failures arrive as [`crate::deploy::Error`]; argument problems
//! detected before a run starts are [`CliError`].

use thiserror::Error;

/// Result type alias for command line operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Main error type for the command line tool
#[derive(Error, Debug)]
pub enum DeployError {
    /// CLI argument errors
    #[error("{0}")]
    Cli(#[from] CliError),

    /// Deployment errors
    #[error("{0}")]
    Deploy(#[from] crate::deploy::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Conflicting arguments
    #[error("conflicting arguments: {}", arguments.join(" and "))]
    ConflictingArguments {
        /// Arguments that conflict
        arguments: Vec<String>,
    },
}

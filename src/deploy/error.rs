//! Error types for deployment operations.
//!
//! Every fatal condition in the embedding engine maps onto one of these
//! variants. Link-policy findings are reported, never raised.

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the deployer.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing bundle, no usable architectures, conflicting options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested gem, or one of its dependencies, could not be resolved.
    #[error("gem `{name}` could not be resolved: {reason}")]
    Resolution {
        /// Gem that failed to resolve
        name: String,
        /// Why resolution failed
        reason: String,
    },

    /// The runtime compiler rejected a source file.
    #[error("failed to compile {}: {stderr}", source_path.display())]
    Compile {
        /// Source file that failed to compile
        source_path: PathBuf,
        /// Compiler diagnostics
        stderr: String,
    },

    /// A subprocess exited with a non-zero status.
    #[error("command `{command}` failed with {status}: {stderr}")]
    CommandFailed {
        /// Full command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// Filesystem error with the operation and path that caused it.
    #[error("{context} {}: {error}", path.display())]
    Fs {
        /// What was being attempted
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        error: io::Error,
    },

    /// Directory walk error.
    #[error("{0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    GlobPattern(#[from] glob::PatternError),

    /// Info.plist could not be read.
    #[error("failed to read Info.plist: {0}")]
    Plist(#[from] plist::Error),

    /// Layout configuration could not be parsed.
    #[error("failed to parse layout configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid regular expression.
    #[error("{0}")]
    Regex(#[from] regex::Error),

    /// Mach-O parsing failed.
    #[error("failed to parse Mach-O {}: {error}", path.display())]
    MachO {
        /// Binary that failed to parse
        path: PathBuf,
        /// Parser error
        error: goblin::error::Error,
    },

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

/// Convenient type alias of Result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Attaches a lazily built message to a [`Result`] or [`Option`], converting it into [`Error::GenericError`].
pub trait Context<T> {
    /// Adds a lazily evaluated message.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::GenericError(format!("{}: {e}", f())))
    }
}

impl<T> Context<T> for Option<T> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Attaches the failing operation and path to IO errors.
pub trait ErrorExt<T> {
    /// Wraps the error in [`Error::Fs`].
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::deploy::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::deploy::Error::GenericError($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::deploy::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

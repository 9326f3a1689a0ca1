//! External tool detection and availability checking.
//!
//! The deployer rewrites install names with Apple's `install_name_tool`; it is
//! looked up once per process.

use std::path::PathBuf;
use std::sync::LazyLock;

/// Location of `install_name_tool`, if it is on `PATH`.
///
/// Cached result to avoid repeated lookups while relinking.
pub static INSTALL_NAME_TOOL: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| match which::which("install_name_tool") {
        Ok(path) => {
            log::debug!("Found install_name_tool at: {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("install_name_tool not found in PATH: {}", e);
            None
        }
    });

//! Dependency closure of a gem.

use super::index::GemIndex;
use crate::deploy::{Error, Result};
use std::path::PathBuf;

/// Require path directories of `name` and everything it depends on at runtime.
///
/// Dependencies come first, in declaration order, and `name`'s own
/// directories last. A gem reachable along several paths is resolved (and
/// listed) once per path.
///
/// # Errors
///
/// [`Error::Resolution`] if `name` or any dependency is not installed, or if
/// the dependency graph loops.
pub fn closure<I: GemIndex>(index: &I, name: &str) -> Result<Vec<PathBuf>> {
    let mut in_progress = Vec::new();
    let mut dirs = Vec::new();
    visit(index, name, &mut in_progress, &mut dirs)?;
    Ok(dirs)
}

fn visit<I: GemIndex>(
    index: &I,
    name: &str,
    in_progress: &mut Vec<String>,
    dirs: &mut Vec<PathBuf>,
) -> Result<()> {
    if let Some(start) = in_progress.iter().position(|n| n == name) {
        let mut chain = in_progress[start..].to_vec();
        chain.push(name.to_string());
        return Err(Error::Resolution {
            name: name.to_string(),
            reason: format!("dependency cycle detected: {}", chain.join(" -> ")),
        });
    }

    let spec = index.find(name).map_err(|e| match (e, in_progress.last()) {
        (Error::Resolution { name, reason }, Some(parent)) => Error::Resolution {
            name,
            reason: format!("{reason} (required by {parent})"),
        },
        (e, _) => e,
    })?;

    in_progress.push(name.to_string());
    for dep in &spec.dependencies {
        visit(index, dep, in_progress, dirs)?;
    }
    in_progress.pop();

    dirs.extend(spec.require_dirs());
    Ok(())
}

//! Framework version handling.
//!
//! An installed framework may carry several `Versions/<v>` directories with
//! `Versions/Current` a symlink to one of them. The embedded copy keeps only
//! that one, renamed to `Versions/Current`.

use crate::deploy::{
    Error, Result,
    error::ErrorExt,
    utils::fs,
};
use std::path::{Path, PathBuf};

const CURRENT: &str = "Current";

/// The installed framework being embedded.
#[derive(Clone, Debug)]
pub struct RuntimeDistribution {
    version: String,
    versions: Vec<String>,
}

impl RuntimeDistribution {
    /// Inspects the framework at `root` and determines its current version.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if `root` is not a framework or the current
    /// version cannot be told apart from the others.
    pub fn open(root: &Path) -> Result<Self> {
        let versions_dir = root.join("Versions");
        if !versions_dir.is_dir() {
            return Err(Error::Configuration(format!(
                "{} is not an installed framework (no Versions directory)",
                root.display()
            )));
        }

        let mut versions = Vec::new();
        for entry in
            std::fs::read_dir(&versions_dir).fs_context("failed to read framework versions", &versions_dir)?
        {
            let entry = entry.fs_context("failed to read framework versions", &versions_dir)?;
            versions.push(entry.file_name().to_string_lossy().into_owned());
        }
        versions.sort();

        let alias = versions_dir.join(CURRENT);
        let version = match std::fs::read_link(&alias) {
            Ok(target) => target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::Configuration(format!("{} points nowhere", alias.display()))
                })?,
            Err(_) if alias.is_dir() => CURRENT.to_string(),
            Err(_) => {
                let real: Vec<&String> = versions.iter().filter(|v| *v != CURRENT).collect();
                match real.as_slice() {
                    [only] => only.to_string(),
                    _ => {
                        return Err(Error::Configuration(format!(
                            "cannot tell the current version of {} ({} has no Current alias)",
                            root.display(),
                            versions_dir.display()
                        )));
                    }
                }
            }
        };

        if !versions_dir.join(&version).is_dir() {
            return Err(Error::Configuration(format!(
                "current version {} of {} is missing",
                version,
                root.display()
            )));
        }

        Ok(Self {
            version,
            versions,
        })
    }

    /// Name of the version directory `Versions/Current` resolves to.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Version directories other than the current one and its alias.
    pub fn stale_versions(&self) -> impl Iterator<Item = &str> {
        self.versions
            .iter()
            .map(String::as_str)
            .filter(|v| *v != self.version && *v != CURRENT)
    }
}

/// Turns the copied `Versions/<version>` into the real `Versions/Current` and
/// drops symlinks that no longer resolve or that point outside the framework.
pub async fn normalize(framework: &Path, version: &str) -> Result<()> {
    let versions = framework.join("Versions");
    if version != CURRENT {
        let alias = versions.join(CURRENT);
        match tokio::fs::symlink_metadata(&alias).await {
            Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(&alias).await?,
            Ok(_) => fs::remove_dir_all(&alias).await?,
            Err(_) => {}
        }
        let real = versions.join(version);
        tokio::fs::rename(&real, &alias)
            .await
            .fs_context("failed to rename version directory", &real)?;
        log::debug!("renamed {} to {}", real.display(), alias.display());
    }

    for link in stale_links(framework).await? {
        log::debug!("removing stale symlink {}", link.display());
        fs::remove_file(&link).await?;
    }
    Ok(())
}

/// Symlinks below `root` that dangle, use an absolute target, or resolve
/// to something outside `root`.
async fn stale_links(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let base = std::fs::canonicalize(&root).fs_context("failed to resolve framework", &root)?;
        let mut stale = Vec::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(false) {
            let entry = entry?;
            if !entry.path_is_symlink() {
                continue;
            }
            let target = std::fs::read_link(entry.path())
                .fs_context("failed to read symlink", entry.path())?;
            let inside = !target.is_absolute()
                && std::fs::canonicalize(entry.path()).is_ok_and(|resolved| resolved.starts_with(&base));
            if !inside {
                stale.push(entry.into_path());
            }
        }
        Ok(stale)
    })
    .await
    .map_err(|e| Error::GenericError(format!("symlink scan task panicked: {e}")))?
}

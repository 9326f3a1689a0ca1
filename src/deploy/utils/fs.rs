//! File system utilities for deployment.
//!
//! Provides the copy, merge and removal primitives the embedder is built on,
//! with symlink preservation and idempotent removal.

use crate::deploy::error::{Error, ErrorExt, Result};
use glob::{MatchOptions, Pattern};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// `*` and `?` never cross a `/`.
pub const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("failed to create directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("failed to remove directory", path),
    }
}

/// Removes a file or symlink if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("failed to remove file", path),
    }
}

/// Makes a symbolic link.
#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link.
#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.parent().map(|p| p.join(src).is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        crate::bail!("{from:?} is not a file");
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("failed to create directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("failed to copy file", from)?;
    Ok(())
}

/// Mirrors `from` into `to`, skipping every entry whose path relative to
/// `from` matches one of `excludes`.
///
/// An excluded directory is skipped with everything below it. Symlinks are
/// recreated, not followed. `to` must not exist yet.
pub async fn copy_dir_excluding(from: &Path, to: &Path, excludes: &[Pattern]) -> Result<()> {
    if !from.is_dir() {
        crate::bail!("{from:?} is not a directory");
    }
    if to.exists() {
        crate::bail!("{to:?} already exists");
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();
    let excludes = excludes.to_vec();

    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("failed to create directory", parent)?;
        }

        let walker = walkdir::WalkDir::new(&from)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let Ok(rel) = entry.path().strip_prefix(&from) else {
                    return true;
                };
                let excluded = excludes
                    .iter()
                    .any(|p| p.matches_path_with(rel, PATH_MATCH));
                if excluded {
                    log::debug!("excluding {}", rel.display());
                }
                !excluded
            });

        for entry in walker {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);
            copy_entry(&entry, &dest_path)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("directory copy task panicked: {e}")))?
}

/// Copies the contents of `from` into `to`, keeping whatever `to` already
/// holds. Files present in both are overwritten.
pub async fn merge_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        crate::bail!("{from:?} is not a directory");
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        for entry in walkdir::WalkDir::new(&from).follow_links(false) {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);
            if !entry.file_type().is_dir() && dest_path.symlink_metadata().is_ok() {
                std::fs::remove_file(&dest_path)
                    .fs_context("failed to replace file", &dest_path)?;
            }
            copy_entry(&entry, &dest_path)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("directory merge task panicked: {e}")))?
}

fn copy_entry(entry: &walkdir::DirEntry, dest_path: &Path) -> Result<()> {
    if entry.file_type().is_symlink() {
        let target =
            std::fs::read_link(entry.path()).fs_context("failed to read symlink", entry.path())?;
        symlink(&target, dest_path).fs_context("failed to create symlink", dest_path)?;
    } else if entry.file_type().is_dir() {
        std::fs::create_dir_all(dest_path).fs_context("failed to create directory", dest_path)?;
    } else {
        std::fs::copy(entry.path(), dest_path).fs_context("failed to copy file", entry.path())?;
    }
    Ok(())
}

/// Lists every regular file below `root` in sorted order. Symlinks are not
/// followed and not listed. A missing `root` yields an empty list.
pub async fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| Error::GenericError(format!("directory walk task panicked: {e}")))?
}

/// Expands `pattern` relative to `root` and returns the matching paths, sorted.
pub fn glob_in(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!("{}/{}", Pattern::escape(&root.to_string_lossy()), pattern);
    let mut matches = Vec::new();
    for entry in glob::glob_with(&full, PATH_MATCH)? {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => log::debug!("skipping unreadable path {}", e.path().display()),
        }
    }
    matches.sort();
    Ok(matches)
}

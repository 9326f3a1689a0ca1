//! Standard library pruning.
//!
//! The embedded standard library is listed once into a snapshot; which files
//! go is then decided by pure functions over that snapshot, and only the
//! final deletion touches the disk.
//!
//! Two rules, in order:
//! 1. With a keep list, a file survives only if one of the keep forms of a
//!    kept unit matches it.
//! 2. A source file goes if its compiled object was in the snapshot. This is
//!    checked against the snapshot taken *before* rule 1, so dropping an
//!    object through the keep list never brings its source back.

use crate::deploy::{
    Result,
    settings::RuntimeLayout,
    utils::fs,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File extensions the pruner cares about.
#[derive(Clone, Copy, Debug)]
pub struct Extensions<'a> {
    pub source: &'a str,
    pub object: &'a str,
    pub bundle: &'a str,
}

impl<'a> From<&'a RuntimeLayout> for Extensions<'a> {
    fn from(layout: &'a RuntimeLayout) -> Self {
        Self {
            source: &layout.source_ext,
            object: &layout.object_ext,
            bundle: &layout.bundle_ext,
        }
    }
}

/// One way a kept unit claims files under a standard library root.
#[derive(Clone, Debug, PartialEq, Eq)]
enum KeepForm {
    /// `root/unit`, and everything below it if it is a directory.
    Bare(PathBuf),
    /// `root/unit.*`, one level.
    Extension { dir: PathBuf, prefix: String },
    /// `root/unit/**/*.{source,object,bundle}`.
    Recursive(PathBuf),
}

impl KeepForm {
    fn matches(&self, file: &Path, exts: &Extensions<'_>) -> bool {
        match self {
            KeepForm::Bare(path) => file.starts_with(path),
            KeepForm::Extension { dir, prefix } => {
                file.parent() == Some(dir.as_path())
                    && file
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with(prefix.as_str()))
            }
            KeepForm::Recursive(dir) => {
                file != dir
                    && file.starts_with(dir)
                    && file.extension().is_some_and(|e| {
                        e == exts.source || e == exts.object || e == exts.bundle
                    })
            }
        }
    }
}

fn keep_forms(roots: &[PathBuf], units: &[String]) -> Vec<KeepForm> {
    let mut forms = Vec::new();
    for root in roots {
        for unit in units {
            let unit_path = root.join(unit.trim_matches('/'));
            let Some(name) = unit_path.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };
            let dir = unit_path.parent().unwrap_or(root).to_path_buf();
            forms.push(KeepForm::Bare(unit_path.clone()));
            forms.push(KeepForm::Extension {
                dir,
                prefix: format!("{name}."),
            });
            forms.push(KeepForm::Recursive(unit_path));
        }
    }
    forms
}

/// Decides which files of `snapshot` to delete.
///
/// `roots` are the standard library directories the snapshot was taken from;
/// an empty `keep` list keeps every unit.
pub fn plan_prune(
    roots: &[PathBuf],
    snapshot: &BTreeSet<PathBuf>,
    keep: &[String],
    exts: &Extensions<'_>,
) -> BTreeSet<PathBuf> {
    let mut doomed = BTreeSet::new();

    if !keep.is_empty() {
        let forms = keep_forms(roots, keep);
        doomed.extend(
            snapshot
                .iter()
                .filter(|file| !forms.iter().any(|form| form.matches(file, exts)))
                .cloned(),
        );
    }

    let shadowed: Vec<PathBuf> = snapshot
        .iter()
        .filter(|file| !doomed.contains(*file))
        .filter(|file| file.extension().is_some_and(|e| e == exts.source))
        .filter(|file| snapshot.contains(&file.with_extension(exts.object)))
        .cloned()
        .collect();
    doomed.extend(shadowed);

    doomed
}

/// What [`prune`] removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneSummary {
    pub roots: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Expands the standard library patterns below `current` and snapshots every file under them.
pub async fn snapshot(
    current: &Path,
    layout: &RuntimeLayout,
) -> Result<(Vec<PathBuf>, BTreeSet<PathBuf>)> {
    let mut roots = BTreeSet::new();
    for pattern in &layout.stdlib_patterns {
        roots.extend(fs::glob_in(current, pattern)?.into_iter().filter(|p| p.is_dir()));
    }
    let roots: Vec<PathBuf> = roots.into_iter().collect();

    let mut files = BTreeSet::new();
    for root in &roots {
        files.extend(fs::list_files(root).await?);
    }
    Ok((roots, files))
}

/// Prunes the standard library under `current` (an embedded `Versions/Current`).
pub async fn prune(current: &Path, layout: &RuntimeLayout, keep: &[String]) -> Result<PruneSummary> {
    let (roots, files) = snapshot(current, layout).await?;
    let doomed = plan_prune(&roots, &files, keep, &Extensions::from(layout));

    for file in &doomed {
        fs::remove_file(file).await?;
    }

    if keep.is_empty() {
        log::info!("Removed {} shadowed source files from the standard library", doomed.len());
    } else {
        log::info!(
            "Kept {} of {} standard library files ({})",
            files.len() - doomed.len(),
            files.len(),
            keep.join(", ")
        );
    }

    Ok(PruneSummary {
        roots,
        removed: doomed.into_iter().collect(),
    })
}

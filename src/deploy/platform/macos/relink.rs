//! Relinks bundle binaries against the embedded runtime library.
//!
//! Two passes:
//! 1. Consumers: executables in `Contents/MacOS`, extensions and compiled
//!    objects inside the embedded framework, and compiled objects under
//!    `Contents/Resources` get every reference to the installed runtime
//!    library rewritten to the `@executable_path` form.
//! 2. Identity: each embedded runtime dylib gets the same `@executable_path`
//!    form as its install name.
//!
//! Any failed rewrite aborts the run; a half-relinked bundle does not launch.

use super::MachOTools;
use crate::deploy::{
    Result,
    settings::{RuntimeLayout, Settings},
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Decides which library references point at the installed runtime.
#[derive(Clone, Debug)]
pub struct RelinkPlan {
    /// Installed framework root, with a trailing `/`.
    build_root: String,
    /// Install names the installed runtime dylibs identify themselves with.
    build_identities: Vec<String>,
    library_stem: String,
    library_dir: String,
}

impl RelinkPlan {
    pub fn new(layout: &RuntimeLayout, framework: &Path, build_identities: Vec<String>) -> Self {
        let mut build_root = framework.to_string_lossy().into_owned();
        if !build_root.ends_with('/') {
            build_root.push('/');
        }
        Self {
            build_root,
            build_identities,
            library_stem: layout.library_stem.clone(),
            library_dir: layout.relative_library_dir(),
        }
    }

    /// Reads the identities of the runtime dylibs in the installed framework.
    pub async fn discover<T: MachOTools>(tools: &T, settings: &Settings) -> Result<Self> {
        let lib_dir = settings.framework_current().join("usr").join("lib");
        let mut identities = Vec::new();
        for lib in runtime_libraries(settings.layout(), &lib_dir).await? {
            if let Some(id) = tools.identity(&lib).await? {
                log::debug!("{} identifies as {}", lib.display(), id);
                identities.push(id);
            }
        }
        Ok(Self::new(settings.layout(), settings.framework(), identities))
    }

    /// Replacement for `reference`, or `None` if it does not point at the installed runtime.
    pub fn rewrite(&self, reference: &str) -> Option<String> {
        if reference.starts_with('@') {
            return None;
        }
        let file_name = Path::new(reference).file_name()?.to_string_lossy();
        let from_build = self.build_identities.iter().any(|id| id == reference)
            || (reference.starts_with(&self.build_root)
                && file_name.starts_with(&self.library_stem)
                && file_name.ends_with(".dylib"));
        from_build.then(|| self.anchored(&file_name))
    }

    fn anchored(&self, file_name: &str) -> String {
        format!("{}/{}", self.library_dir, file_name)
    }
}

/// Counts of what [`relink`] changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelinkSummary {
    pub references: usize,
    pub identities: usize,
}

/// Runs both relink passes over the bundle described by `settings`.
pub async fn relink<T: MachOTools>(
    tools: &T,
    settings: &Settings,
    plan: &RelinkPlan,
) -> Result<RelinkSummary> {
    let mut summary = RelinkSummary::default();

    for binary in consumers(settings).await? {
        for reference in tools.linked_libraries(&binary).await? {
            if let Some(new) = plan.rewrite(&reference) {
                log::debug!("{}: {} -> {}", binary.display(), reference, new);
                tools.change_reference(&binary, &reference, &new).await?;
                summary.references += 1;
            }
        }
    }

    let lib_dir = settings.embedded_current().join("usr").join("lib");
    for lib in runtime_libraries(settings.layout(), &lib_dir).await? {
        let current = tools.identity(&lib).await?;
        let name = match current.as_deref().and_then(|id| Path::new(id).file_name()) {
            Some(name) => name.to_string_lossy().into_owned(),
            None => file_name(&lib),
        };
        let new = plan.anchored(&name);
        if current.as_deref() != Some(new.as_str()) {
            log::debug!("{}: id -> {}", lib.display(), new);
            tools.change_identity(&lib, &new).await?;
            summary.identities += 1;
        }
    }

    log::info!(
        "Relinked {} references and {} library identities",
        summary.references,
        summary.identities
    );
    Ok(summary)
}

/// Binaries whose references to the runtime must be rewritten, in discovery order.
async fn consumers(settings: &Settings) -> Result<Vec<PathBuf>> {
    let layout = settings.layout();
    let mut binaries = fs::list_files(&settings.macos_dir()).await?;

    let embedded_lib = settings.embedded_current().join("usr").join("lib");
    binaries.extend(
        fs::list_files(&embedded_lib)
            .await?
            .into_iter()
            .filter(|p| has_ext(p, &layout.bundle_ext) || has_ext(p, &layout.object_ext)),
    );

    binaries.extend(
        fs::list_files(&settings.resources_dir())
            .await?
            .into_iter()
            .filter(|p| has_ext(p, &layout.object_ext)),
    );
    Ok(binaries)
}

/// Regular files (not symlinks) below `dir` named like the runtime library.
async fn runtime_libraries(layout: &RuntimeLayout, dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs::list_files(dir)
        .await?
        .into_iter()
        .filter(|p| layout.is_runtime_library(&file_name(p)))
        .collect())
}

fn has_ext(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

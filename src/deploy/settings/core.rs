//! Core Settings struct and implementations.

use super::{ArchitectureSet, RuntimeLayout};
use std::path::{Path, PathBuf};

/// Which part of the standard library ends up in the bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StdlibSelection {
    /// Embed the whole standard library.
    #[default]
    All,
    /// Embed none of it.
    Excluded,
    /// Embed only the named units (e.g. `json`, `net/http`).
    Only(Vec<String>),
}

/// Main settings for a deployment run.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder), which
/// validates option combinations and the bundle layout up front so that a
/// bad invocation never touches the bundle.
#[derive(Clone, Debug)]
pub struct Settings {
    /// The `.app` directory.
    bundle: PathBuf,

    /// Installed framework being embedded.
    framework: PathBuf,

    /// Naming conventions of the framework.
    layout: RuntimeLayout,

    /// Compile loose sources under `Contents/Resources`.
    compile: bool,

    /// Embed the framework.
    embed: bool,

    stdlib: StdlibSelection,

    /// Gems to embed, in request order.
    gems: Vec<String>,

    /// Where gems are installed; defaults to the framework's own gem home.
    gem_home: Option<PathBuf>,

    /// Copy system BridgeSupport files into the bundle.
    bridgesupport: bool,

    /// Explicit architecture list; inferred from the main executable when `None`.
    archs: Option<ArchitectureSet>,
}

impl Settings {
    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    pub fn framework(&self) -> &Path {
        &self.framework
    }

    pub fn layout(&self) -> &RuntimeLayout {
        &self.layout
    }

    pub fn compile(&self) -> bool {
        self.compile
    }

    pub fn embed(&self) -> bool {
        self.embed
    }

    pub fn stdlib(&self) -> &StdlibSelection {
        &self.stdlib
    }

    pub fn gems(&self) -> &[String] {
        &self.gems
    }

    pub fn bridgesupport(&self) -> bool {
        self.bridgesupport
    }

    pub fn archs(&self) -> Option<&ArchitectureSet> {
        self.archs.as_ref()
    }

    /// `Contents` directory of the bundle.
    pub fn contents_dir(&self) -> PathBuf {
        self.bundle.join("Contents")
    }

    /// Directory holding the primary executable.
    pub fn macos_dir(&self) -> PathBuf {
        self.contents_dir().join("MacOS")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.contents_dir().join("Resources")
    }

    pub fn frameworks_dir(&self) -> PathBuf {
        self.contents_dir().join("Frameworks")
    }

    pub fn info_plist(&self) -> PathBuf {
        self.contents_dir().join("Info.plist")
    }

    /// Root of the embedded framework copy.
    pub fn embedded_framework(&self) -> PathBuf {
        self.frameworks_dir().join(&self.layout.framework_name)
    }

    /// `Versions/Current` of the installed framework.
    pub fn framework_current(&self) -> PathBuf {
        self.framework.join("Versions").join("Current")
    }

    /// `Versions/Current` of the embedded framework.
    pub fn embedded_current(&self) -> PathBuf {
        self.embedded_framework().join("Versions").join("Current")
    }

    /// Gem home to resolve gems from.
    pub fn gem_home(&self) -> PathBuf {
        self.gem_home
            .clone()
            .unwrap_or_else(|| self.framework_current().join(&self.layout.gem_home))
    }

    /// Compiler shipped with the installed framework.
    pub fn compiler(&self) -> PathBuf {
        self.framework_current().join(&self.layout.compiler)
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        bundle: PathBuf,
        framework: PathBuf,
        layout: RuntimeLayout,
        compile: bool,
        embed: bool,
        stdlib: StdlibSelection,
        gems: Vec<String>,
        gem_home: Option<PathBuf>,
        bridgesupport: bool,
        archs: Option<ArchitectureSet>,
    ) -> Self {
        Self {
            bundle,
            framework,
            layout,
            compile,
            embed,
            stdlib,
            gems,
            gem_home,
            bridgesupport,
            archs,
        }
    }
}

//! Builder for constructing Settings.

use super::{ArchitectureSet, RuntimeLayout, Settings, StdlibSelection};
use crate::deploy::{Error, Result};
use std::path::{Path, PathBuf};

/// Installed location of the framework when none is given.
pub const DEFAULT_FRAMEWORKS_DIR: &str = "/Library/Frameworks";

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use macruby_deploy::deploy::SettingsBuilder;
///
/// # fn example() -> macruby_deploy::deploy::Result<()> {
/// let settings = SettingsBuilder::new()
///     .bundle("build/Release/Hello.app")
///     .embed(true)
///     .stdlib_only(vec!["json".into()])
///     .gems(vec!["rack".into()])
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    bundle: Option<PathBuf>,
    framework: Option<PathBuf>,
    layout: RuntimeLayout,
    compile: bool,
    embed: bool,
    no_stdlib: bool,
    stdlib: Vec<String>,
    gems: Vec<String>,
    gem_home: Option<PathBuf>,
    bridgesupport: bool,
    archs: Option<ArchitectureSet>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the `.app` bundle to deploy into.
    ///
    /// # Required
    pub fn bundle<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.bundle = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the installed framework to embed.
    ///
    /// Default: `/Library/Frameworks/<framework_name>`
    pub fn framework<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.framework = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn layout(mut self, layout: RuntimeLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn compile(mut self, compile: bool) -> Self {
        self.compile = compile;
        self
    }

    pub fn embed(mut self, embed: bool) -> Self {
        self.embed = embed;
        self
    }

    /// Leaves the standard library out of the embedded framework.
    pub fn no_stdlib(mut self, no_stdlib: bool) -> Self {
        self.no_stdlib = no_stdlib;
        self
    }

    /// Keeps only these standard library units.
    pub fn stdlib_only(mut self, units: Vec<String>) -> Self {
        self.stdlib = units;
        self
    }

    pub fn gems(mut self, gems: Vec<String>) -> Self {
        self.gems = gems;
        self
    }

    pub fn gem_home<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.gem_home = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn bridgesupport(mut self, bridgesupport: bool) -> Self {
        self.bridgesupport = bridgesupport;
        self
    }

    /// Overrides architecture detection.
    ///
    /// An empty list is treated as no override.
    pub fn archs(mut self, archs: ArchitectureSet) -> Self {
        self.archs = (!archs.is_empty()).then_some(archs);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when:
    /// - no bundle was given, or it is not an application bundle
    /// - neither compiling nor embedding was requested
    /// - embed-only options are used without embedding
    /// - `no_stdlib` and `stdlib_only` are combined
    pub fn build(self) -> Result<Settings> {
        let bundle = self
            .bundle
            .ok_or_else(|| Error::Configuration("no application bundle given".into()))?;

        if !self.compile && !self.embed {
            return Err(Error::Configuration(
                "nothing to do, pass --compile and/or --embed".into(),
            ));
        }
        if !self.embed {
            let mut embed_only = Vec::new();
            if self.no_stdlib {
                embed_only.push("--no-stdlib");
            }
            if !self.stdlib.is_empty() {
                embed_only.push("--stdlib");
            }
            if !self.gems.is_empty() {
                embed_only.push("--gem");
            }
            if self.bridgesupport {
                embed_only.push("--bs");
            }
            if !embed_only.is_empty() {
                return Err(Error::Configuration(format!(
                    "{} only make sense together with --embed",
                    embed_only.join(", ")
                )));
            }
        }
        let stdlib = match (self.no_stdlib, self.stdlib.is_empty()) {
            (true, false) => {
                return Err(Error::Configuration(
                    "--no-stdlib and --stdlib cannot be combined".into(),
                ));
            }
            (true, true) => StdlibSelection::Excluded,
            (false, true) => StdlibSelection::All,
            (false, false) => StdlibSelection::Only(self.stdlib),
        };

        check_bundle(&bundle)?;

        let framework = self
            .framework
            .unwrap_or_else(|| Path::new(DEFAULT_FRAMEWORKS_DIR).join(&self.layout.framework_name));

        Ok(Settings::new(
            bundle,
            framework,
            self.layout,
            self.compile,
            self.embed,
            stdlib,
            self.gems,
            self.gem_home,
            self.bridgesupport,
            self.archs,
        ))
    }
}

fn check_bundle(bundle: &Path) -> Result<()> {
    if !bundle.is_dir() {
        return Err(Error::Configuration(format!(
            "application bundle {} does not exist",
            bundle.display()
        )));
    }
    if !bundle.join("Contents").join("MacOS").is_dir() {
        return Err(Error::Configuration(format!(
            "{} is not an application bundle (no Contents/MacOS)",
            bundle.display()
        )));
    }
    Ok(())
}

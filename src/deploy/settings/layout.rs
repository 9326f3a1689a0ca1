//! Runtime framework layout and naming conventions.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory names and file naming rules of the runtime framework.
///
/// Defaults describe an installed `MacRuby.framework`. Every field can be
/// overridden from a TOML file:
///
/// ```toml
/// framework_name = "MacRuby.framework"
/// library_stem = "libmacruby"
/// stdlib_patterns = ["usr/lib/ruby/1.9.*"]
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeLayout {
    /// Directory name of the framework, e.g. `MacRuby.framework`.
    pub framework_name: String,

    /// File name prefix of the shared runtime library (`libmacruby*.dylib`).
    pub library_stem: String,

    /// Extension of loose source files.
    pub source_ext: String,

    /// Extension of precompiled objects.
    pub object_ext: String,

    /// Extension of native extension bundles.
    pub bundle_ext: String,

    /// Standard library directories, as glob patterns relative to `Versions/Current`.
    pub stdlib_patterns: Vec<String>,

    /// Gem site directory relative to `Versions/Current`.
    pub site_dir: PathBuf,

    /// Gem home relative to `Versions/Current` when none is given explicitly.
    pub gem_home: PathBuf,

    /// Patterns relative to the framework root that are never embedded.
    pub excluded: Vec<String>,

    /// Library path prefixes an embedded bundle must not link against.
    pub disallowed_link_prefixes: Vec<String>,

    /// Where the system BridgeSupport files live.
    pub bridgesupport_dir: PathBuf,

    /// Compiler relative to `Versions/Current`.
    pub compiler: PathBuf,
}

impl Default for RuntimeLayout {
    fn default() -> Self {
        Self {
            framework_name: "MacRuby.framework".into(),
            library_stem: "libmacruby".into(),
            source_ext: "rb".into(),
            object_ext: "rbo".into(),
            bundle_ext: "bundle".into(),
            stdlib_patterns: vec![
                "usr/lib/ruby/1.9.*".into(),
                "usr/lib/ruby/1.9.*/universal-darwin*".into(),
                "usr/lib/ruby/site_ruby/1.9.*".into(),
                "usr/lib/ruby/site_ruby/1.9.*/universal-darwin*".into(),
            ],
            site_dir: PathBuf::from("usr/lib/ruby/site_ruby/1.9.2"),
            gem_home: PathBuf::from("usr/lib/ruby/Gems/1.9.2"),
            excluded: vec![
                "Headers".into(),
                "Versions/*/Headers".into(),
                "Versions/*/usr/bin".into(),
                "Versions/*/usr/include".into(),
                "Versions/*/usr/share".into(),
                "Versions/*/usr/lib/libmacruby-static.a".into(),
                "Versions/*/usr/lib/ruby/Gems".into(),
            ],
            disallowed_link_prefixes: vec![
                "/usr/local/".into(),
                "/opt/local/".into(),
                "/opt/homebrew/".into(),
                "/sw/".into(),
                "/Users/".into(),
                "/Library/".into(),
            ],
            bridgesupport_dir: PathBuf::from("/System/Library/BridgeSupport"),
            compiler: PathBuf::from("usr/bin/macrubyc"),
        }
    }
}

impl RuntimeLayout {
    /// Loads a layout from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> crate::deploy::Result<Self> {
        use crate::deploy::error::ErrorExt;

        let contents =
            std::fs::read_to_string(path).fs_context("failed to read layout file", path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// `true` if `name` is a runtime library file name (`libmacruby*.dylib`).
    pub fn is_runtime_library(&self, name: &str) -> bool {
        name.starts_with(&self.library_stem) && name.ends_with(".dylib")
    }

    /// Install-name anchor every relinked reference points at.
    pub fn relative_library_dir(&self) -> String {
        format!(
            "@executable_path/../Frameworks/{}/Versions/Current/usr/lib",
            self.framework_name
        )
    }
}

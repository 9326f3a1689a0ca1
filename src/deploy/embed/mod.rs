//! Embedding the runtime framework into an application bundle.
//!
//! [`embed`] runs the whole sequence: resolve gems, copy the framework with
//! exclusions, collapse its versions into `Versions/Current`, prune the
//! standard library, stage gems, copy BridgeSupport files, relink, and check
//! link policy. Steps run strictly in order and the first failure aborts;
//! nothing is rolled back, so a failed run needs a fresh successful one.

pub mod prune;
mod versions;

pub use prune::{PruneSummary, plan_prune};
pub use versions::RuntimeDistribution;

use crate::deploy::{
    Context, Error, Result,
    gems::{GemIndex, closure},
    platform::macos::{self, LinkViolation, MachOTools, RelinkPlan, RelinkSummary},
    settings::{Settings, StdlibSelection},
    utils::fs,
};
use glob::Pattern;
use std::path::PathBuf;

/// What an embed run did.
#[derive(Debug, Default)]
pub struct EmbedReport {
    /// Version of the framework that was embedded.
    pub version: String,
    /// Standard library files removed by pruning.
    pub pruned: usize,
    /// Gem directories staged into the site directory.
    pub gem_dirs: usize,
    /// BridgeSupport files copied.
    pub bridgesupport_files: usize,
    pub relink: RelinkSummary,
    /// Advisory findings; never fatal.
    pub violations: Vec<LinkViolation>,
}

/// Embeds the framework described by `settings` into its bundle.
pub async fn embed<T: MachOTools, I: GemIndex>(
    tools: &T,
    gems: &I,
    settings: &Settings,
) -> Result<EmbedReport> {
    let layout = settings.layout();

    // Resolve everything that can fail without touching the bundle.
    let mut gem_dirs: Vec<(String, Vec<PathBuf>)> = Vec::new();
    for gem in settings.gems() {
        let dirs = closure(gems, gem)?;
        if let Some(missing) = dirs.iter().find(|dir| !dir.is_dir()) {
            return Err(Error::Resolution {
                name: gem.clone(),
                reason: format!("require path {} is missing", missing.display()),
            });
        }
        log::info!("Resolved gem {} ({} directories)", gem, dirs.len());
        gem_dirs.push((gem.clone(), dirs));
    }
    let distribution = RuntimeDistribution::open(settings.framework())?;
    let plan = RelinkPlan::discover(tools, settings).await?;
    if settings.bridgesupport() && !layout.bridgesupport_dir.is_dir() {
        return Err(Error::Configuration(format!(
            "BridgeSupport directory {} not found",
            layout.bridgesupport_dir.display()
        )));
    }
    let excludes = exclude_patterns(settings, &distribution)?;

    let target = settings.embedded_framework();
    log::info!(
        "Embedding {} (version {}) into {}",
        settings.framework().display(),
        distribution.version(),
        target.display()
    );
    fs::create_dir_all(&settings.frameworks_dir(), false).await?;
    fs::remove_dir_all(&target).await?;
    fs::copy_dir_excluding(settings.framework(), &target, &excludes).await?;

    versions::normalize(&target, distribution.version()).await?;

    let current = settings.embedded_current();
    let pruned = match settings.stdlib() {
        StdlibSelection::Excluded => 0,
        StdlibSelection::All => prune::prune(&current, layout, &[]).await?.removed.len(),
        StdlibSelection::Only(units) => prune::prune(&current, layout, units).await?.removed.len(),
    };

    let mut staged = 0;
    if !gem_dirs.is_empty() {
        let site = current.join(&layout.site_dir);
        fs::create_dir_all(&site, false).await?;
        for (gem, dirs) in &gem_dirs {
            log::info!("Copying gem {} into {}", gem, site.display());
            for dir in dirs {
                fs::merge_dir(dir, &site).await?;
                staged += 1;
            }
        }
    }

    let bridgesupport_files = if settings.bridgesupport() {
        embed_bridgesupport(settings).await?
    } else {
        0
    };

    let relink = macos::relink(tools, settings, &plan).await?;

    let violations = macos::check_bundle(tools, settings).await.unwrap_or_else(|e| {
        log::warn!("Link policy check could not complete: {}", e);
        Vec::new()
    });

    Ok(EmbedReport {
        version: distribution.version().to_string(),
        pruned,
        gem_dirs: staged,
        bridgesupport_files,
        relink,
        violations,
    })
}

/// Patterns, relative to the framework root, that are never copied.
fn exclude_patterns(settings: &Settings, distribution: &RuntimeDistribution) -> Result<Vec<Pattern>> {
    let layout = settings.layout();
    let mut patterns: Vec<String> = layout.excluded.clone();

    if *settings.stdlib() == StdlibSelection::Excluded {
        patterns.extend(layout.stdlib_patterns.iter().map(|p| format!("Versions/*/{p}")));
    }
    for version in distribution.stale_versions() {
        patterns.push(format!("Versions/{}", Pattern::escape(version)));
    }

    log::debug!("excluding {}", patterns.join(", "));
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Error::from))
        .collect()
}

/// Copies the system BridgeSupport files into `Contents/Resources/BridgeSupport`.
async fn embed_bridgesupport(settings: &Settings) -> Result<usize> {
    let source = &settings.layout().bridgesupport_dir;
    let dest = settings.resources_dir().join("BridgeSupport");
    fs::create_dir_all(&dest, false).await?;

    let files = fs::glob_in(source, "*.bridgesupport")?;
    for file in &files {
        let name = file
            .file_name()
            .with_context(|| format!("invalid path {}", file.display()))?;
        fs::copy_file(file, &dest.join(name)).await?;
    }
    log::info!("Embedded {} BridgeSupport files", files.len());
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{
        RuntimeLayout, SettingsBuilder,
        gems::InstalledGems,
        platform::macos::fake::{FakeBinary, FakeTools},
    };
    use std::path::Path;

    const BUILD_LIB: &str =
        "/Library/Frameworks/MacRuby.framework/Versions/0.12/usr/lib/libmacruby.1.9.2.dylib";
    const EMBEDDED_LIB: &str = "@executable_path/../Frameworks/MacRuby.framework/Versions/Current/usr/lib/libmacruby.1.9.2.dylib";

    fn touch(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[cfg(unix)]
    fn link(target: &str, at: &Path) {
        std::os::unix::fs::symlink(target, at).unwrap();
    }

    /// Installed framework with two versions, headers, a stdlib and a gem home.
    #[cfg(unix)]
    fn framework(root: &Path) -> PathBuf {
        let fw = root.join("MacRuby.framework");
        let v = fw.join("Versions/0.12");
        touch(&fw.join("Versions/0.11/usr/lib/old.txt"), "");
        link("0.12", &fw.join("Versions/Current"));
        link("Versions/Current/Headers", &fw.join("Headers"));
        link("Versions/Current/MacRuby", &fw.join("MacRuby"));
        FakeBinary::new(&["x86_64", "arm64"], Some(BUILD_LIB), &["/usr/lib/libSystem.B.dylib"])
            .write(&v.join("usr/lib/libmacruby.1.9.2.dylib"));
        link("libmacruby.1.9.2.dylib", &v.join("usr/lib/libmacruby.dylib"));
        link("usr/lib/libmacruby.dylib", &v.join("MacRuby"));
        touch(&v.join("Headers/ruby.h"), "");
        touch(&v.join("usr/bin/macrubyc"), "");
        touch(&v.join("usr/lib/libmacruby-static.a"), "");

        let stdlib = v.join("usr/lib/ruby/1.9.2");
        touch(&stdlib.join("json.rb"), "");
        FakeBinary::new(&["x86_64"], None, &[BUILD_LIB]).write(&stdlib.join("json.rbo"));
        touch(&stdlib.join("yaml.rb"), "");
        FakeBinary::new(&["x86_64"], None, &[BUILD_LIB, "/opt/local/lib/libyaml.dylib"])
            .write(&stdlib.join("universal-darwin10.0/yaml.bundle"));
        touch(&v.join("usr/lib/ruby/site_ruby/1.9.2/.keep"), "");

        let gems = v.join("usr/lib/ruby/Gems/1.9.2");
        touch(
            &gems.join("specifications/rack-test-0.5.6.gemspec"),
            "s.add_runtime_dependency(%q<rack>, [\">= 1.0\"])",
        );
        touch(&gems.join("specifications/rack-1.2.1.gemspec"), "");
        touch(&gems.join("gems/rack-1.2.1/lib/rack.rb"), "rack");
        touch(&gems.join("gems/rack-test-0.5.6/lib/rack/test.rb"), "rack-test");
        fw
    }

    #[cfg(unix)]
    fn app(root: &Path) -> PathBuf {
        let app = root.join("Hello.app");
        FakeBinary::new(&["x86_64"], None, &[BUILD_LIB]).write(&app.join("Contents/MacOS/Hello"));
        FakeBinary::new(&["x86_64"], None, &[BUILD_LIB])
            .write(&app.join("Contents/Resources/rb_main.rbo"));
        // leftovers of a previous deployment
        touch(
            &app.join("Contents/Frameworks/MacRuby.framework/Versions/Current/stale.txt"),
            "",
        );
        app
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn embeds_relinks_and_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .embed(true)
            .stdlib_only(vec!["json".into(), "yaml".into()])
            .gems(vec!["rack-test".into()])
            .build()
            .unwrap();

        let tools = FakeTools::default();
        let gems = InstalledGems::new(settings.gem_home());
        let report = embed(&tools, &gems, &settings).await.unwrap();

        let embedded = settings.embedded_framework();
        let current = settings.embedded_current();

        // versions collapsed into a real Current directory
        assert_eq!(report.version, "0.12");
        assert!(current.is_dir());
        assert!(!current.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(!embedded.join("Versions/0.12").exists());
        assert!(!embedded.join("Versions/0.11").exists());
        assert!(!current.join("stale.txt").exists());

        // exclusions and dangling aliases
        assert!(embedded.join("Headers").symlink_metadata().is_err());
        assert!(!current.join("Headers").exists());
        assert!(!current.join("usr/bin").exists());
        assert!(!current.join("usr/lib/libmacruby-static.a").exists());
        assert!(!current.join("usr/lib/ruby/Gems").exists());
        assert!(embedded.join("MacRuby").exists());

        // stdlib pruned, gems staged dependency first
        let stdlib = current.join("usr/lib/ruby/1.9.2");
        assert!(!stdlib.join("json.rb").exists());
        assert!(stdlib.join("json.rbo").is_file());
        assert!(stdlib.join("yaml.rb").is_file());
        let site = current.join(RuntimeLayout::default().site_dir);
        assert_eq!(std::fs::read_to_string(site.join("rack.rb")).unwrap(), "rack");
        assert_eq!(std::fs::read_to_string(site.join("rack/test.rb")).unwrap(), "rack-test");
        assert_eq!(report.gem_dirs, 2);

        // relinked
        for binary in [
            app.join("Contents/MacOS/Hello"),
            app.join("Contents/Resources/rb_main.rbo"),
            stdlib.join("json.rbo"),
            stdlib.join("universal-darwin10.0/yaml.bundle"),
        ] {
            let fake = FakeBinary::read(&binary).unwrap();
            assert!(fake.libs.contains(&EMBEDDED_LIB.to_string()), "{}", binary.display());
            assert!(!fake.libs.contains(&BUILD_LIB.to_string()));
        }
        let lib = FakeBinary::read(&current.join("usr/lib/libmacruby.1.9.2.dylib")).unwrap();
        assert_eq!(lib.id.as_deref(), Some(EMBEDDED_LIB));

        // the installed framework is untouched
        let original = FakeBinary::read(&fw.join("Versions/0.12/usr/lib/libmacruby.1.9.2.dylib"));
        assert_eq!(original.unwrap().id.as_deref(), Some(BUILD_LIB));

        // link policy is advisory
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].library, "/opt/local/lib/libyaml.dylib");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn no_stdlib_leaves_stdlib_out() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .embed(true)
            .no_stdlib(true)
            .build()
            .unwrap();

        let report = embed(&FakeTools::default(), &InstalledGems::new(settings.gem_home()), &settings)
            .await
            .unwrap();
        assert_eq!(report.pruned, 0);
        assert!(!settings.embedded_current().join("usr/lib/ruby/1.9.2").exists());
        assert!(settings.embedded_current().join("usr/lib/libmacruby.1.9.2.dylib").is_file());
        assert!(report.violations.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unknown_gem_aborts_before_copying() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .embed(true)
            .gems(vec!["sinatra".into()])
            .build()
            .unwrap();

        let err = embed(&FakeTools::default(), &InstalledGems::new(settings.gem_home()), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
        // previous embedded copy still in place
        assert!(settings.embedded_current().join("stale.txt").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn gem_without_require_dir_aborts_before_copying() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        touch(
            &fw.join("Versions/0.12/usr/lib/ruby/Gems/1.9.2/specifications/broken-1.0.gemspec"),
            "",
        );
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .embed(true)
            .gems(vec!["broken".into()])
            .build()
            .unwrap();

        let err = embed(&FakeTools::default(), &InstalledGems::new(settings.gem_home()), &settings)
            .await
            .unwrap_err();
        match err {
            Error::Resolution { name, reason } => {
                assert_eq!(name, "broken");
                assert!(reason.contains("gems/broken-1.0/lib"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(settings.embedded_current().join("stale.txt").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_bridgesupport_dir_aborts_before_copying() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        let layout = RuntimeLayout {
            bridgesupport_dir: tmp.path().join("NoBridgeSupport"),
            ..RuntimeLayout::default()
        };
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .layout(layout)
            .embed(true)
            .bridgesupport(true)
            .build()
            .unwrap();

        let err = embed(&FakeTools::default(), &InstalledGems::new(settings.gem_home()), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("NoBridgeSupport"));
        assert!(settings.embedded_current().join("stale.txt").is_file());
        assert!(!settings.resources_dir().join("BridgeSupport").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn relink_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .embed(true)
            .build()
            .unwrap();

        let tools = FakeTools { fail_rewrites: true, ..FakeTools::default() };
        let result = embed(&tools, &InstalledGems::new(settings.gem_home()), &settings).await;
        assert!(matches!(result, Err(Error::CommandFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn copies_bridgesupport_files() {
        let tmp = tempfile::tempdir().unwrap();
        let fw = framework(tmp.path());
        let app = app(tmp.path());
        let bs = tmp.path().join("BridgeSupport");
        touch(&bs.join("Foundation.bridgesupport"), "<signatures/>");
        touch(&bs.join("README"), "");
        let layout = RuntimeLayout {
            bridgesupport_dir: bs,
            ..RuntimeLayout::default()
        };
        let settings = SettingsBuilder::new()
            .bundle(&app)
            .framework(&fw)
            .layout(layout)
            .embed(true)
            .bridgesupport(true)
            .build()
            .unwrap();

        let report = embed(&FakeTools::default(), &InstalledGems::new(settings.gem_home()), &settings)
            .await
            .unwrap();
        assert_eq!(report.bridgesupport_files, 1);
        let dest = settings.resources_dir().join("BridgeSupport");
        assert!(dest.join("Foundation.bridgesupport").is_file());
        assert!(!dest.join("README").exists());
    }
}

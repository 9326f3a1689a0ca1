//! Target architecture resolution.

use crate::deploy::{
    Error, Result,
    platform::macos::MachOTools,
    settings::{ArchitectureSet, Settings},
    utils::fs,
};
use std::path::PathBuf;

/// Determines the architectures to deploy for.
///
/// Candidates are the explicit list from `settings`, or the architectures of
/// the bundle's main executable. They are intersected with what the installed
/// runtime library supports; unsupported candidates are dropped with a
/// warning.
///
/// # Errors
///
/// [`Error::Configuration`] if no candidate can be found or none is supported.
pub async fn resolve_architectures<T: MachOTools>(
    tools: &T,
    settings: &Settings,
) -> Result<ArchitectureSet> {
    let candidates = match settings.archs() {
        Some(archs) => archs.clone(),
        None => {
            let executable = main_executable(settings).await?;
            let archs = ArchitectureSet::new(tools.architectures(&executable).await?);
            if archs.is_empty() {
                return Err(Error::Configuration(format!(
                    "cannot determine the architectures of {}",
                    executable.display()
                )));
            }
            archs
        }
    };

    let library = runtime_library(settings).await?;
    let supported = ArchitectureSet::new(tools.architectures(&library).await?);
    let (resolved, unsupported) = candidates.partition(&supported);

    if resolved.is_empty() {
        return Err(Error::Configuration(format!(
            "none of the architectures {} are supported by {} (supports {})",
            candidates,
            library.display(),
            supported
        )));
    }
    if let Some(warning) = unsupported_warning(&unsupported) {
        log::warn!("{}", warning);
    }

    log::info!("Deploying for {}", resolved);
    Ok(resolved)
}

/// Warning for candidates the runtime cannot run, if any were dropped.
fn unsupported_warning(unsupported: &[String]) -> Option<String> {
    if unsupported.is_empty() {
        return None;
    }
    Some(format!(
        "Ignoring architectures not supported by the installed runtime: {}",
        unsupported.join(", ")
    ))
}

/// The bundle's primary executable: `CFBundleExecutable` from `Info.plist`,
/// or the first file in `Contents/MacOS` when there is no plist entry.
pub async fn main_executable(settings: &Settings) -> Result<PathBuf> {
    let plist = settings.info_plist();
    if plist.is_file() {
        let value = plist::Value::from_file(&plist)?;
        if let Some(name) = value
            .as_dictionary()
            .and_then(|dict| dict.get("CFBundleExecutable"))
            .and_then(|v| v.as_string())
        {
            let executable = settings.macos_dir().join(name);
            if executable.is_file() {
                return Ok(executable);
            }
            return Err(Error::Configuration(format!(
                "CFBundleExecutable {} does not exist",
                executable.display()
            )));
        }
    }

    fs::list_files(&settings.macos_dir())
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::Configuration(format!(
                "no executable in {}",
                settings.macos_dir().display()
            ))
        })
}

/// The installed runtime library whose slices define the supported architectures.
async fn runtime_library(settings: &Settings) -> Result<PathBuf> {
    let lib_dir = settings.framework_current().join("usr").join("lib");
    let layout = settings.layout();

    let preferred = lib_dir.join(format!("{}.dylib", layout.library_stem));
    if preferred.is_file() {
        return Ok(preferred);
    }
    fs::list_files(&lib_dir)
        .await?
        .into_iter()
        .find(|p| {
            p.file_name()
                .is_some_and(|n| layout.is_runtime_library(&n.to_string_lossy()))
        })
        .ok_or_else(|| {
            Error::Configuration(format!(
                "no runtime library found in {}, is the framework installed?",
                lib_dir.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{
        SettingsBuilder,
        platform::macos::fake::{FakeBinary, FakeTools},
    };

    fn setup(exe_archs: &[&str], runtime_archs: &[&str]) -> (tempfile::TempDir, SettingsBuilder) {
        let tmp = tempfile::tempdir().unwrap();
        let fw = tmp.path().join("MacRuby.framework");
        FakeBinary::new(runtime_archs, None, &[])
            .write(&fw.join("Versions/Current/usr/lib/libmacruby.dylib"));
        let app = tmp.path().join("Hello.app");
        FakeBinary::new(exe_archs, None, &[]).write(&app.join("Contents/MacOS/Hello"));
        let builder = SettingsBuilder::new().bundle(&app).framework(&fw).compile(true);
        (tmp, builder)
    }

    #[tokio::test]
    async fn explicit_list_is_intersected_with_supported() {
        let (_tmp, builder) = setup(&["ppc"], &["x86_64", "arm64"]);
        let settings = builder
            .archs(ArchitectureSet::new(["x86_64", "i386"]))
            .build()
            .unwrap();
        let archs = resolve_architectures(&FakeTools::default(), &settings).await.unwrap();
        assert_eq!(archs, ArchitectureSet::new(["x86_64"]));
    }

    #[test]
    fn dropped_architectures_are_named_in_the_warning() {
        let candidates = ArchitectureSet::new(["x86_64", "i386"]);
        let supported = ArchitectureSet::new(["x86_64", "arm64"]);
        let (_, unsupported) = candidates.partition(&supported);
        let warning = unsupported_warning(&unsupported).unwrap();
        assert!(warning.contains("i386"));
        assert!(!warning.contains("x86_64"));

        let (_, unsupported) = supported.partition(&supported);
        assert_eq!(unsupported_warning(&unsupported), None);
    }

    #[tokio::test]
    async fn inferred_from_executable() {
        let (_tmp, builder) = setup(&["x86_64", "i386"], &["i386", "x86_64", "ppc"]);
        let settings = builder.build().unwrap();
        let archs = resolve_architectures(&FakeTools::default(), &settings).await.unwrap();
        assert_eq!(archs, ArchitectureSet::new(["x86_64", "i386"]));
    }

    #[tokio::test]
    async fn empty_intersection_is_fatal() {
        let (_tmp, builder) = setup(&["ppc"], &["x86_64"]);
        let settings = builder.build().unwrap();
        let err = resolve_architectures(&FakeTools::default(), &settings).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("ppc"));
    }

    #[tokio::test]
    async fn intersection_property() {
        let supported = ["x86_64", "arm64", "i386"];
        let candidates: [&[&str]; 4] = [&["x86_64"], &["ppc", "arm64"], &["ppc"], &["i386", "x86_64"]];
        for c in candidates {
            let (_tmp, builder) = setup(&["x86_64"], &supported);
            let settings = builder.archs(ArchitectureSet::new(c.iter().copied())).build().unwrap();
            let result = resolve_architectures(&FakeTools::default(), &settings).await;
            let expected: Vec<&str> = c.iter().copied().filter(|a| supported.contains(a)).collect();
            match result {
                Ok(archs) => assert_eq!(archs.iter().collect::<Vec<_>>(), expected),
                Err(_) => assert!(expected.is_empty()),
            }
        }
    }

    #[tokio::test]
    async fn executable_named_by_info_plist() {
        let (tmp, builder) = setup(&["x86_64"], &["x86_64"]);
        let app = tmp.path().join("Hello.app");
        FakeBinary::new(&["x86_64"], None, &[]).write(&app.join("Contents/MacOS/Another"));
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleExecutable".into(), plist::Value::String("Hello".into()));
        plist::Value::Dictionary(dict)
            .to_file_xml(app.join("Contents/Info.plist"))
            .unwrap();

        let settings = builder.build().unwrap();
        assert_eq!(
            main_executable(&settings).await.unwrap(),
            app.join("Contents/MacOS/Hello")
        );
        // without a plist the first executable wins
        std::fs::remove_file(app.join("Contents/Info.plist")).unwrap();
        assert_eq!(
            main_executable(&settings).await.unwrap(),
            app.join("Contents/MacOS/Another")
        );
    }
}

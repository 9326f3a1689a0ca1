//! Link policy check for embedded extension bundles.
//!
//! An extension that links against a library outside the system locations
//! works on the build machine and crashes everywhere else. Findings are
//! logged as warnings and returned; they never fail the run.

use super::MachOTools;
use crate::deploy::{Result, settings::Settings, utils::fs};
use std::path::{Path, PathBuf};

/// A loadable bundle referencing a library in a disallowed location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkViolation {
    pub bundle: PathBuf,
    pub library: String,
}

/// Checks every extension bundle under `roots` against `disallowed` prefixes.
///
/// Unreadable binaries are logged and skipped; the check keeps going.
pub async fn check_linking<T: MachOTools>(
    tools: &T,
    roots: &[PathBuf],
    bundle_ext: &str,
    disallowed: &[String],
) -> Result<Vec<LinkViolation>> {
    let mut violations = Vec::new();

    for root in roots {
        for bundle in fs::list_files(root).await? {
            if !bundle.extension().is_some_and(|e| e == bundle_ext) {
                continue;
            }
            let libs = match tools.linked_libraries(&bundle).await {
                Ok(libs) => libs,
                Err(e) => {
                    log::warn!("Could not inspect {}: {}", bundle.display(), e);
                    continue;
                }
            };
            let found: Vec<LinkViolation> = libs
                .into_iter()
                .filter(|lib| is_disallowed(lib, disallowed))
                .map(|library| LinkViolation {
                    bundle: bundle.clone(),
                    library,
                })
                .collect();
            if !found.is_empty() {
                report(&bundle, &found);
                violations.extend(found);
            }
        }
    }

    Ok(violations)
}

/// Runs [`check_linking`] over the embedded framework and the bundle resources.
pub async fn check_bundle<T: MachOTools>(
    tools: &T,
    settings: &Settings,
) -> Result<Vec<LinkViolation>> {
    let layout = settings.layout();
    check_linking(
        tools,
        &[settings.embedded_framework(), settings.resources_dir()],
        &layout.bundle_ext,
        &layout.disallowed_link_prefixes,
    )
    .await
}

fn is_disallowed(library: &str, disallowed: &[String]) -> bool {
    disallowed.iter().any(|prefix| library.starts_with(prefix.as_str()))
}

fn report(bundle: &Path, found: &[LinkViolation]) {
    let mut message = format!(
        "{} links against libraries that will not exist on other machines:",
        bundle.display()
    );
    for violation in found {
        message.push_str("\n    ");
        message.push_str(&violation.library);
    }
    message.push_str("\n  Copy them into the bundle and relink, or the extension will fail to load.");
    log::warn!("{message}");
}

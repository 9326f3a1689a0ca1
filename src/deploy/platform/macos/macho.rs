//! Mach-O introspection and install-name rewriting.
//!
//! Introspection parses binaries in-process with goblin; rewriting shells out
//! to `install_name_tool`. Both sit behind [`MachOTools`] so the engine can be
//! exercised without Apple's toolchain.

use crate::deploy::{
    builder::tool_detection::INSTALL_NAME_TOOL,
    error::{Error, ErrorExt, Result},
};
use goblin::mach::{
    Mach, MachO,
    constants::cputype::{CPU_SUBTYPE_MASK, CpuSubType, CpuType, get_arch_name_from_types},
};
use std::path::Path;

/// Binary operations the deployer needs, one method per operation.
#[allow(async_fn_in_trait)]
pub trait MachOTools {
    /// Checks that the tools can run at all, before the bundle is touched.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Architectures contained in `binary`. Empty if it is not Mach-O.
    async fn architectures(&self, binary: &Path) -> Result<Vec<String>>;

    /// Libraries `binary` links against, without the self entry. Empty if it is not Mach-O.
    async fn linked_libraries(&self, binary: &Path) -> Result<Vec<String>>;

    /// Install name a dylib identifies itself with, if any.
    async fn identity(&self, binary: &Path) -> Result<Option<String>>;

    /// Rewrites the reference `old` in `binary` to `new`.
    async fn change_reference(&self, binary: &Path, old: &str, new: &str) -> Result<()>;

    /// Rewrites the install name of the dylib `binary`.
    async fn change_identity(&self, binary: &Path, new: &str) -> Result<()>;
}

/// [`MachOTools`] backed by goblin and `install_name_tool`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTools;

impl MachOTools for SystemTools {
    fn preflight(&self) -> Result<()> {
        match INSTALL_NAME_TOOL.as_deref() {
            Some(tool) => {
                log::debug!("using {}", tool.display());
                Ok(())
            }
            None => Err(missing_install_name_tool()),
        }
    }

    async fn architectures(&self, binary: &Path) -> Result<Vec<String>> {
        let buffer = read_binary(binary).await?;
        let archs = match Mach::parse(&buffer) {
            Ok(Mach::Binary(macho)) => name_of(macho.header.cputype, macho.header.cpusubtype)
                .into_iter()
                .collect(),
            Ok(Mach::Fat(fat)) => {
                let mut names = Vec::new();
                for arch in fat.iter_arches() {
                    let arch = arch.map_err(|error| Error::MachO {
                        path: binary.to_path_buf(),
                        error,
                    })?;
                    names.extend(name_of(arch.cputype, arch.cpusubtype));
                }
                names
            }
            Err(_) => {
                log::debug!("{} is not a Mach-O file", binary.display());
                Vec::new()
            }
        };
        Ok(archs)
    }

    async fn linked_libraries(&self, binary: &Path) -> Result<Vec<String>> {
        let buffer = read_binary(binary).await?;
        Ok(with_first_slice(binary, &buffer, |macho| {
            macho
                .libs
                .iter()
                .skip(1)
                .map(|s| s.to_string())
                .collect()
        })?
        .unwrap_or_default())
    }

    async fn identity(&self, binary: &Path) -> Result<Option<String>> {
        let buffer = read_binary(binary).await?;
        Ok(with_first_slice(binary, &buffer, |macho| macho.name.map(str::to_string))?.flatten())
    }

    async fn change_reference(&self, binary: &Path, old: &str, new: &str) -> Result<()> {
        install_name_tool(&["-change", old, new], binary).await
    }

    async fn change_identity(&self, binary: &Path, new: &str) -> Result<()> {
        install_name_tool(&["-id", new], binary).await
    }
}

/// Architecture name as `lipo` and the compiler's `--arch` flag spell it.
fn name_of(cputype: CpuType, cpusubtype: CpuSubType) -> Option<String> {
    // high byte carries capability bits such as LIB64
    let name = get_arch_name_from_types(cputype, cpusubtype & !CPU_SUBTYPE_MASK);
    if name.is_none() {
        log::debug!("ignoring unknown cputype {cputype:#x}/{cpusubtype:#x}");
    }
    name.map(str::to_string)
}

async fn read_binary(binary: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(binary)
        .await
        .fs_context("failed to read binary", binary)
}

/// Runs `f` on the binary, or on the first slice of a fat binary.
///
/// All slices of a runtime binary carry the same load commands. Returns
/// `None` for files that are not Mach-O.
fn with_first_slice<T>(
    binary: &Path,
    buffer: &[u8],
    f: impl FnOnce(&MachO<'_>) -> T,
) -> Result<Option<T>> {
    let parse_error = |error| Error::MachO {
        path: binary.to_path_buf(),
        error,
    };
    match Mach::parse(buffer) {
        Ok(Mach::Binary(macho)) => Ok(Some(f(&macho))),
        Ok(Mach::Fat(fat)) => {
            let Some(first) = fat.iter_arches().next() else {
                return Ok(None);
            };
            let first = first.map_err(parse_error)?;
            let macho = MachO::parse(first.slice(buffer), 0).map_err(parse_error)?;
            Ok(Some(f(&macho)))
        }
        Err(_) => {
            log::debug!("{} is not a Mach-O file", binary.display());
            Ok(None)
        }
    }
}

fn missing_install_name_tool() -> Error {
    Error::Configuration("install_name_tool not found, install the Xcode command line tools".into())
}

async fn install_name_tool(args: &[&str], binary: &Path) -> Result<()> {
    let tool = INSTALL_NAME_TOOL
        .as_deref()
        .ok_or_else(missing_install_name_tool)?;

    let command_line = format!(
        "{} {} {}",
        tool.display(),
        args.join(" "),
        binary.display()
    );
    log::debug!("{command_line}");

    let output = tokio::process::Command::new(tool)
        .args(args)
        .arg(binary)
        .output()
        .await
        .fs_context("failed to run install_name_tool", binary)?;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            command: command_line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

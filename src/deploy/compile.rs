//! Compiling loose sources into precompiled objects.

use crate::deploy::{
    Error, Result,
    settings::{ArchitectureSet, Settings},
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Turns one source file into one precompiled object.
#[allow(async_fn_in_trait)]
pub trait Compiler {
    /// Compiles `source` for `archs` and returns the object path.
    ///
    /// Must leave `source` in place; the caller removes it on success.
    async fn compile(&self, source: &Path, archs: &ArchitectureSet) -> Result<PathBuf>;
}

/// The compiler shipped with the runtime framework.
#[derive(Debug, Clone)]
pub struct RuntimeCompiler {
    program: PathBuf,
    object_ext: String,
}

impl RuntimeCompiler {
    pub fn new(program: impl Into<PathBuf>, object_ext: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            object_ext: object_ext.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.compiler(), settings.layout().object_ext.clone())
    }
}

impl Compiler for RuntimeCompiler {
    async fn compile(&self, source: &Path, archs: &ArchitectureSet) -> Result<PathBuf> {
        if !self.program.is_file() {
            return Err(Error::Configuration(format!(
                "compiler not found at {}",
                self.program.display()
            )));
        }
        let object = source.with_extension(&self.object_ext);

        let mut command = tokio::process::Command::new(&self.program);
        command.arg("-C");
        for arch in archs.iter() {
            command.arg("--arch").arg(arch);
        }
        command.arg(source).arg("-o").arg(&object);
        log::debug!("{:?}", command.as_std());

        let output = command.output().await.map_err(|e| Error::Fs {
            context: "failed to run compiler",
            path: self.program.clone(),
            error: e,
        })?;

        if !output.status.success() {
            return Err(Error::Compile {
                source_path: source.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(object)
    }
}

/// Compiles every source file under `Contents/Resources`, removing each
/// source once its object exists.
///
/// Stops at the first failure; sources compiled before it stay compiled.
pub async fn compile_resources<C: Compiler>(
    compiler: &C,
    settings: &Settings,
    archs: &ArchitectureSet,
) -> Result<Vec<PathBuf>> {
    let source_ext = &settings.layout().source_ext;
    let sources: Vec<PathBuf> = fs::list_files(&settings.resources_dir())
        .await?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == source_ext.as_str()))
        .collect();

    let mut objects = Vec::with_capacity(sources.len());
    for source in sources {
        log::info!("Compiling {}", source.display());
        let object = compiler.compile(&source, archs).await?;
        fs::remove_file(&source).await?;
        objects.push(object);
    }
    Ok(objects)
}

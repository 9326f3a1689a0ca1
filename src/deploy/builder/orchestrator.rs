//! Main deployment orchestration.
//!
//! This module provides the [`Deployer`] that runs the requested steps of a
//! deployment in order against one bundle.

use crate::deploy::{
    Result, Settings,
    compile::{Compiler, RuntimeCompiler, compile_resources},
    embed::{EmbedReport, embed},
    gems::InstalledGems,
    platform::macos::{MachOTools, SystemTools},
    settings::ArchitectureSet,
};

use super::architectures::resolve_architectures;

/// What a deployment did.
#[derive(Debug)]
pub struct DeployReport {
    /// Architectures the run targeted.
    pub archs: ArchitectureSet,
    /// Objects produced by the compile step.
    pub compiled: usize,
    /// Present when the framework was embedded.
    pub embed: Option<EmbedReport>,
}

/// Deployment orchestrator.
///
/// Runs compile then embed, each only when [`Settings`] asks for it. The
/// binary tools and the compiler are type parameters so that the whole run
/// can be driven without Apple's toolchain.
///
/// # Examples
///
/// ```no_run
/// use macruby_deploy::deploy::{Deployer, SettingsBuilder};
///
/// # async fn example() -> macruby_deploy::deploy::Result<()> {
/// let settings = SettingsBuilder::new()
///     .bundle("build/Release/Hello.app")
///     .compile(true)
///     .embed(true)
///     .build()?;
///
/// let report = Deployer::new(settings).deploy().await?;
/// println!("Deployed for {}", report.archs);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Deployer<T = SystemTools, C = RuntimeCompiler> {
    settings: Settings,
    tools: T,
    compiler: C,
}

impl Deployer {
    /// Creates a deployer using the system tools and the framework's compiler.
    pub fn new(settings: Settings) -> Self {
        let compiler = RuntimeCompiler::from_settings(&settings);
        Self {
            settings,
            tools: SystemTools,
            compiler,
        }
    }
}

impl<T: MachOTools, C: Compiler> Deployer<T, C> {
    pub fn with_tools(settings: Settings, tools: T, compiler: C) -> Self {
        Self {
            settings,
            tools,
            compiler,
        }
    }

    /// Runs the deployment.
    ///
    /// Tool availability and architectures are checked before anything in
    /// the bundle changes. After that, the first failing step aborts the run
    /// and earlier steps are not undone.
    pub async fn deploy(&self) -> Result<DeployReport> {
        let settings = &self.settings;
        if settings.embed() {
            self.tools.preflight()?;
        }

        let archs = resolve_architectures(&self.tools, settings).await?;

        let compiled = if settings.compile() {
            let objects = compile_resources(&self.compiler, settings, &archs).await?;
            log::info!("Compiled {} source files", objects.len());
            objects.len()
        } else {
            0
        };

        let embed = if settings.embed() {
            let gems = InstalledGems::new(settings.gem_home());
            Some(embed(&self.tools, &gems, settings).await?)
        } else {
            None
        };

        Ok(DeployReport {
            archs,
            compiled,
            embed,
        })
    }
}

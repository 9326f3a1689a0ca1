//! Command line argument parsing and validation.
//!
//! Arguments are parsed with clap, checked for conflicts in [`Args::validate`]
//! and turned into deployment [`Settings`] by [`Args::to_settings`].

use crate::{
    deploy::{ArchitectureSet, RuntimeLayout, Settings, SettingsBuilder},
    error::{CliError, Result},
};
use clap::Parser;
use std::path::PathBuf;

/// Embeds the MacRuby framework into an application bundle
#[derive(Parser, Debug)]
#[command(
    name = "macruby_deploy",
    version,
    about = "Embeds the MacRuby framework into an application bundle",
    long_about = "Compiles an application's Ruby sources and embeds the MacRuby framework into its bundle,
relinking every binary against the embedded copy.

Usage:
  macruby_deploy --compile --embed build/Release/Hello.app
  macruby_deploy --embed --no-stdlib Hello.app
  macruby_deploy --embed --stdlib json --stdlib net/http --gem rack Hello.app

Inside an Xcode build phase the bundle defaults to $TARGET_BUILD_DIR/$FULL_PRODUCT_NAME."
)]
pub struct Args {
    /// Application bundle to deploy
    #[arg(value_name = "BUNDLE")]
    pub bundle: Option<PathBuf>,

    /// Compile Ruby sources under Contents/Resources
    #[arg(long)]
    pub compile: bool,

    /// Embed the framework into the bundle
    #[arg(long)]
    pub embed: bool,

    /// Leave the standard library out of the embedded framework
    #[arg(long)]
    pub no_stdlib: bool,

    /// Embed only this standard library unit (repeatable)
    #[arg(long = "stdlib", value_name = "NAME")]
    pub stdlib: Vec<String>,

    /// Embed this gem and its dependencies (repeatable)
    #[arg(long = "gem", value_name = "NAME")]
    pub gems: Vec<String>,

    /// Copy the system BridgeSupport files into the bundle
    #[arg(long = "bs")]
    pub bridgesupport: bool,

    /// Target architecture (repeatable); inferred from the main executable by default
    #[arg(long = "arch", value_name = "ARCH", env = "ARCHS", value_delimiter = ' ')]
    pub archs: Vec<String>,

    /// Installed framework to embed
    #[arg(long, value_name = "PATH")]
    pub framework: Option<PathBuf>,

    /// Gem home to resolve gems from
    #[arg(long, value_name = "PATH", env = "GEM_HOME")]
    pub gem_home: Option<PathBuf>,

    /// TOML file overriding the framework layout
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log every step and external command
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, env = "TARGET_BUILD_DIR", hide = true)]
    pub target_build_dir: Option<PathBuf>,

    #[arg(long, env = "FULL_PRODUCT_NAME", hide = true)]
    pub full_product_name: Option<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), CliError> {
        if !self.compile && !self.embed {
            return Err(CliError::InvalidArguments {
                reason: "nothing to do, pass --compile and/or --embed".to_string(),
            });
        }

        if self.no_stdlib && !self.stdlib.is_empty() {
            return Err(CliError::ConflictingArguments {
                arguments: vec!["--no-stdlib".to_string(), "--stdlib".to_string()],
            });
        }

        if !self.embed {
            let embed_only = [
                ("--no-stdlib", self.no_stdlib),
                ("--stdlib", !self.stdlib.is_empty()),
                ("--gem", !self.gems.is_empty()),
                ("--bs", self.bridgesupport),
            ];
            if let Some((flag, _)) = embed_only.iter().find(|(_, set)| *set) {
                return Err(CliError::InvalidArguments {
                    reason: format!("{flag} requires --embed"),
                });
            }
        }

        self.bundle_path().map(|_| ())
    }

    /// The bundle to deploy: the positional argument, or the Xcode build product.
    pub fn bundle_path(&self) -> std::result::Result<PathBuf, CliError> {
        if let Some(bundle) = &self.bundle {
            return Ok(bundle.clone());
        }
        match (&self.target_build_dir, &self.full_product_name) {
            (Some(dir), Some(name)) => Ok(dir.join(name)),
            _ => Err(CliError::MissingArgument {
                argument: "BUNDLE (or TARGET_BUILD_DIR and FULL_PRODUCT_NAME)".to_string(),
            }),
        }
    }

    /// Build deployment settings from the arguments
    pub fn to_settings(&self) -> Result<Settings> {
        let layout = match &self.config {
            Some(path) => RuntimeLayout::from_file(path)?,
            None => RuntimeLayout::default(),
        };

        let mut builder = SettingsBuilder::new()
            .bundle(self.bundle_path()?)
            .layout(layout)
            .compile(self.compile)
            .embed(self.embed)
            .no_stdlib(self.no_stdlib)
            .stdlib_only(self.stdlib.clone())
            .gems(self.gems.clone())
            .bridgesupport(self.bridgesupport)
            .archs(ArchitectureSet::new(self.archs.iter().cloned()));

        if let Some(framework) = &self.framework {
            builder = builder.framework(framework);
        }
        if let Some(gem_home) = &self.gem_home {
            builder = builder.gem_home(gem_home);
        }

        Ok(builder.build()?)
    }

    /// Default log filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

//! Runtime framework deployment engine.
//!
//! Turns an application bundle that links against an installed runtime
//! framework into one that carries its own copy:
//!
//! 1. Resolve the target architectures ([`builder::resolve_architectures`])
//! 2. Optionally compile loose sources to objects ([`compile`])
//! 3. Copy the framework into `Contents/Frameworks`, collapse its versions,
//!    prune the standard library and stage gems ([`embed`])
//! 4. Relink every binary to the embedded copy and report link-policy
//!    violations ([`platform::macos`])
//!
//! # Example
//!
//! ```no_run
//! use macruby_deploy::deploy::{Deployer, SettingsBuilder};
//!
//! # async fn example() -> macruby_deploy::deploy::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .bundle("build/Release/Hello.app")
//!     .embed(true)
//!     .stdlib_only(vec!["json".into()])
//!     .gems(vec!["rack".into()])
//!     .build()?;
//!
//! let report = Deployer::new(settings).deploy().await?;
//! if let Some(embed) = report.embed {
//!     println!("Embedded version {}", embed.version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compile;
pub mod embed;
pub mod error;
pub mod gems;
pub mod platform;
pub mod settings;
pub mod utils;

pub use builder::{DeployReport, Deployer};
pub use compile::{Compiler, RuntimeCompiler};
pub use embed::EmbedReport;
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::macos::{LinkViolation, MachOTools, SystemTools};
pub use settings::{ArchitectureSet, RuntimeLayout, Settings, SettingsBuilder, StdlibSelection};

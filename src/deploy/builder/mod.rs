//! Deployment orchestration.
//!
//! This module provides the [`Deployer`] that coordinates a deployment run:
//!
//! 1. Reads configuration from [`Settings`](crate::deploy::Settings)
//! 2. Checks that the external tools are available
//! 3. Resolves the target architectures
//! 4. Compiles loose sources when asked to
//! 5. Embeds, relinks and link-checks the framework when asked to
//! 6. Returns a [`DeployReport`]

pub mod architectures;
mod orchestrator;
pub mod tool_detection;

pub use architectures::{main_executable, resolve_architectures};
pub use orchestrator::{DeployReport, Deployer};

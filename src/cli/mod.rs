//! Command line interface for the deployer.
//!
//! Parses arguments, initialises logging, runs the [`Deployer`] and
//! summarises what it did.

mod args;

pub use args::Args;

use crate::{
    deploy::{DeployReport, Deployer},
    error::Result,
};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    init_logging(&args);
    run_with(&args).await
}

/// Runs a deployment for already parsed arguments
pub async fn run_with(args: &Args) -> Result<i32> {
    args.validate()?;
    let settings = args.to_settings()?;
    log::debug!("{:#?}", settings);

    let report = Deployer::new(settings).deploy().await?;
    summarize(&report);
    Ok(0)
}

fn init_logging(args: &Args) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp(None)
        .init();
}

fn summarize(report: &DeployReport) {
    if report.compiled > 0 {
        log::info!("Compiled {} files for {}", report.compiled, report.archs);
    }
    if let Some(embed) = &report.embed {
        log::info!(
            "Embedded framework version {}: {} stdlib files pruned, {} gem directories, {} BridgeSupport files",
            embed.version,
            embed.pruned,
            embed.gem_dirs,
            embed.bridgesupport_files
        );
        log::info!(
            "Rewrote {} references and {} library identities",
            embed.relink.references,
            embed.relink.identities
        );
        if !embed.violations.is_empty() {
            log::warn!(
                "{} bundles link against libraries outside the system, see warnings above",
                embed.violations.len()
            );
        }
    }
}

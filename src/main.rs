//! MacRuby deploy - embeds the runtime framework into application bundles.
//!
//! This binary compiles an application's sources and copies, prunes and
//! relinks the runtime framework so the bundle runs standalone.

use std::process;

#[tokio::main]
async fn main() {
    // Logging is initialised by the CLI once --verbose is known
    let exit_code = match macruby_deploy::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}

//! menudata CLI - read-only HTTP access to the menu objects table
//!
//! - `serve`: resolve credentials, bootstrap the pool, run the HTTP server
//! - `check`: same bootstrap, print the health report and exit with its status

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "menudata",
    author,
    version,
    about = "Serve filtered rows from the menu objects table over HTTP",
    long_about = "Read-only JSON API over a single MySQL table, gated by a static API key. \
                  Credentials come from the environment or Google Secret Manager."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(commands::serve::ServeArgs),
    /// Bootstrap once, print the health report as JSON, exit 0 if healthy
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; real deployments use the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::serve::run_serve(args).await,
        Commands::Check(args) => {
            let healthy = commands::check::run_check(args).await?;
            if !healthy {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

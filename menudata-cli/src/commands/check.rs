//! One-shot health check command

use anyhow::{Context, Result};
use clap::Parser;
use menudata_server::health;

use super::BootstrapArgs;

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub bootstrap: BootstrapArgs,
}

/// Print the health report as JSON; returns whether it was healthy.
pub async fn run_check(args: CheckArgs) -> Result<bool> {
    let state = args.bootstrap.build_state().await?;
    let report = health::check(&state);

    let json = serde_json::to_string_pretty(&report).context("failed to serialize health report")?;
    println!("{json}");

    state.database.close().await;
    Ok(report.is_healthy())
}

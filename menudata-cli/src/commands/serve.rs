//! HTTP server command

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use menudata_server::{run_server, ServerConfig};

use super::BootstrapArgs;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[command(flatten)]
    pub bootstrap: BootstrapArgs,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let state = args.bootstrap.build_state().await?;

    let config = ServerConfig {
        bind_addr: SocketAddr::new(args.host, args.port),
    };

    // Blocks until shutdown
    run_server(state, config).await.context("server error")?;

    Ok(())
}

//! Binder daemon - service name registry
//!
//! Runs the binder in the foreground. Services register their endpoints
//! under logical names; clients look them up before connecting.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address
//! binderd
//!
//! # Listen elsewhere
//! binderd --listen 0.0.0.0:7000
//! ```

use std::env;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use parley_binder::{BinderServer, Directory, DEFAULT_BINDER_ADDR};

/// Binder daemon - service name registry
#[derive(Parser, Debug)]
#[command(name = "binderd", version, about)]
struct Args {
    /// Address to listen on (overrides PARLEY_BINDER)
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("binderd=info".parse()?)
                .add_directive("parley_binder=info".parse()?),
        )
        .init();

    let listen_addr = args
        .listen
        .or_else(|| env::var("PARLEY_BINDER").ok())
        .unwrap_or_else(|| DEFAULT_BINDER_ADDR.to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "Binder daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let server = BinderServer::bind(&listen_addr, Directory::new(), cancel_token)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Binder daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

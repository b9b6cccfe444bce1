//! Parley daemon - chat room broker
//!
//! This binary runs as a background daemon, serving chat operations over
//! TCP and registering itself with the binder so clients can resolve it
//! by name.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (foreground)
//! parleyd start
//!
//! # Start the daemon (background/daemonized)
//! parleyd start -d
//!
//! # Stop the daemon
//! parleyd stop
//!
//! # Check daemon status
//! parleyd status
//! ```

use std::env;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use parley_binder::DEFAULT_BINDER_ADDR;
use parleyd::announce::{announce, MESSENGER_SERVICE};
use parleyd::broker::{spawn_broker, BrokerConfig};
use parleyd::server::{BrokerServer, DEFAULT_LISTEN_ADDR};

/// Parley daemon - chat room broker
#[derive(Parser, Debug)]
#[command(name = "parleyd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

fn pid_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("parley");
    state_dir.join("parleyd.pid")
}

fn log_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("parley");
    state_dir.join("parleyd.log")
}

fn read_pid() -> Option<u32> {
    let path = pid_file_path();
    let mut file = File::open(&path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

fn remove_pid_file() {
    let path = pid_file_path();
    let _ = fs::remove_file(path);
}

fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

fn is_daemon_running() -> Option<u32> {
    if let Some(pid) = read_pid() {
        if is_process_running(pid) {
            return Some(pid);
        }
        remove_pid_file();
    }
    None
}

fn stop_daemon(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {pid}");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let command = args.command.unwrap_or(Command::Start { daemon: false });

    match command {
        Command::Start { daemon } => {
            if let Some(pid) = is_daemon_running() {
                eprintln!("Daemon is already running (PID {pid})");
                eprintln!("Use 'parleyd stop' to stop it first.");
                process::exit(1);
            }

            if daemon {
                daemonize()?;
            }

            write_pid()?;

            let result = run_daemon();

            remove_pid_file();

            result
        }
        Command::Stop => {
            if let Some(pid) = is_daemon_running() {
                println!("Stopping daemon (PID {pid})...");
                stop_daemon(pid)?;

                for _ in 0..50 {
                    if !is_process_running(pid) {
                        println!("Daemon stopped.");
                        return Ok(());
                    }
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }

                eprintln!("Daemon did not stop within 5 seconds.");
                process::exit(1);
            } else {
                println!("Daemon is not running.");
                Ok(())
            }
        }
        Command::Status => {
            if let Some(pid) = is_daemon_running() {
                println!("Daemon is running (PID {pid})");

                let listen_addr = env::var("PARLEY_LISTEN")
                    .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
                println!("Listening on: {listen_addr}");

                Ok(())
            } else {
                println!("Daemon is not running.");
                process::exit(1);
            }
        }
    }
}

fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = File::create(&log_path).context("Failed to create log file for stderr")?;

    let daemonize = Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr);

    daemonize.start().context("Failed to daemonize")?;

    Ok(())
}

/// Reads a duration knob from the environment, in whole seconds.
fn env_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[tokio::main]
async fn run_daemon() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("parleyd=info".parse()?)
                .add_directive("parley_core=info".parse()?)
                .add_directive("parley_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "Parley daemon starting"
    );

    let listen_addr =
        env::var("PARLEY_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    let binder_addr =
        env::var("PARLEY_BINDER").unwrap_or_else(|_| DEFAULT_BINDER_ADDR.to_string());

    let defaults = BrokerConfig::default();
    let config = BrokerConfig {
        sweep_interval: env_secs("PARLEY_SWEEP_SECS", defaults.sweep_interval),
        idle_threshold: env_secs("PARLEY_IDLE_EVICT_SECS", defaults.idle_threshold),
    };

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let broker = spawn_broker(config);
    info!(
        sweep_secs = config.sweep_interval.as_secs(),
        evict_secs = config.idle_threshold.as_secs(),
        "Room broker started"
    );

    let server = BrokerServer::bind(&listen_addr, broker, cancel_token)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    let local_addr = server
        .local_addr()
        .context("Failed to read local address")?;

    // Binder absence is tolerated so the daemons can start in any order
    match announce(
        &binder_addr,
        MESSENGER_SERVICE,
        &local_addr.ip().to_string(),
        local_addr.port(),
    )
    .await
    {
        Ok(()) => {}
        Err(e) => {
            warn!(
                binder = %binder_addr,
                error = %e,
                "Binder registration failed, serving direct connections only"
            );
        }
    }

    info!(addr = %local_addr, "Starting server");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Parley daemon stopped");
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

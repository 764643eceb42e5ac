/*!
 * SIMLINK SIM Access Profile Daemon
 * Profile connection control for a single SAP peer
 * Onyx Digital Intelligence Development LLC
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use tokio::net::UnixListener;
use tokio::task::LocalSet;
use tracing::{error, info};

use simlink_daemon::ipc::IpcServer;
use simlink_daemon::{Daemon, DaemonConfig};

#[derive(Parser)]
#[command(name = "simlinkd")]
#[command(about = "SIMLINK SIM Access Profile Daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "/etc/simlink/simlinkd.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon
    Run,
    /// Validate the configuration file and exit
    CheckConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("simlink_daemon={}", log_level))
        .init();

    let config = DaemonConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => LocalSet::new().run_until(run_daemon(config)).await,
        Commands::CheckConfig => {
            println!("{}: ok ({} loopback peers)", cli.config, config.loopback.peers.len());
            Ok(())
        }
    }
}

async fn run_daemon(config: DaemonConfig) -> Result<()> {
    info!("SIMLINK daemon starting...");

    let socket_path = Path::new(&config.socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating socket directory {}", parent.display()))?;
    }
    // Stale socket from a previous run
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("binding {}", config.socket_path))?;

    let daemon = Daemon::start(&config);
    let server = IpcServer::new(listener, daemon.context());

    info!("SIMLINK daemon ready on socket: {}", config.socket_path);

    let result = tokio::select! {
        result = server.run() => result,
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            signal.map_err(Into::into)
        }
    };
    if let Err(e) = &result {
        error!("Daemon stopped with error: {:#}", e);
    }

    daemon.shutdown();
    let _ = std::fs::remove_file(socket_path);
    result
}

/*!
 * SIMLINK SIM Access Profile Client
 * Command-line control of simlinkd
 * Onyx Digital Intelligence Development LLC
 */

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

mod client;

use client::SimlinkClient;
use simlink_daemon::ipc::{Request, Response};

#[derive(Parser)]
#[command(name = "simlink")]
#[command(about = "SIMLINK SIM Access Profile client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Daemon socket path
    #[arg(short, long, default_value = "/run/simlink/simlink.sock")]
    socket: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show profile identity and readiness
    Info,
    /// Check whether the SAP service is bound
    Ready,
    /// Connect a peer, dropping any other connected peer
    Connect { address: String },
    /// Disconnect the connected peer
    Disconnect { address: String },
    /// Show connection state and priority of a peer
    Status { address: String },
    /// Show or change whether a peer is preferred for auto-connect
    Prefer {
        address: String,
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
    },
    /// List peers connected over SAP
    Devices,
    /// List every peer the device cache has seen
    Cache,
    /// Restart the SAP service and rebind
    Restart,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = SimlinkClient::new(cli.socket);

    let request = match cli.command {
        Commands::Info => Request::GetProfile,
        Commands::Ready => Request::IsReady,
        Commands::Connect { address } => Request::Connect { address },
        Commands::Disconnect { address } => Request::Disconnect { address },
        Commands::Status { address } => Request::GetConnectionStatus { address },
        Commands::Prefer { address, on, off } => {
            if on || off {
                Request::SetPreferred { address, preferred: on }
            } else {
                Request::GetPreferred { address }
            }
        }
        Commands::Devices => Request::GetConnectedDevices,
        Commands::Cache => Request::ListDevices,
        Commands::Restart => Request::RestartService,
    };

    print_response(client.send_request(request).await?)
}

fn print_response(response: Response) -> Result<()> {
    match response {
        Response::Profile { profile } => {
            println!("{} ({})", profile.display_name, profile.name);
            println!("  ordinal:          {}", profile.ordinal);
            println!("  uuids:            {}", profile.uuids.join(", "));
            println!("  ready:            {}", profile.ready);
            println!("  connectable:      {}", profile.connectable);
            println!("  auto-connectable: {}", profile.auto_connectable);
        }
        Response::Ready { ready } => println!("{}", if ready { "ready" } else { "not ready" }),
        Response::Accepted { accepted: true } => println!("accepted"),
        Response::Accepted { accepted: false } => bail!("request rejected"),
        Response::Status { peer, summary } => {
            println!("{}: {} ({})", peer.device, peer.status, summary);
            println!("  priority: {} ({:?})", peer.priority.0, peer.priority.tier());
        }
        Response::Preferred { preferred, priority } => {
            println!("preferred: {} (priority {}, {:?})", preferred, priority.0, priority.tier());
        }
        Response::Devices { devices } => {
            if devices.is_empty() {
                println!("no connected devices");
            }
            for device in devices {
                println!("{}", device);
            }
        }
        Response::CachedDevices { devices } => {
            if devices.is_empty() {
                println!("device cache is empty");
            }
            for device in devices {
                let profiles: Vec<String> = device
                    .profiles
                    .iter()
                    .map(|(name, state)| format!("{}={}", name, state))
                    .collect();
                println!(
                    "{}  {:<13} [{}] refreshed {}x",
                    device.address,
                    device.summary.to_string(),
                    profiles.join(", "),
                    device.refresh_count
                );
            }
        }
        Response::Success { message } => println!("{}", message),
        Response::Error { message } => bail!("{}", message),
    }
    Ok(())
}

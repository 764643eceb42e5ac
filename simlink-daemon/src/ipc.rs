/*!
 * IPC Server for SIMLINK Daemon
 * JSON protocol over Unix socket
 */

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use crate::daemon::DaemonContext;
use crate::device_cache::DeviceSnapshot;
use crate::profile::{PeerAddress, PeerConnectionState, Priority};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    GetProfile,
    IsReady,
    Connect { address: String },
    Disconnect { address: String },
    GetConnectionStatus { address: String },
    GetPreferred { address: String },
    SetPreferred { address: String, preferred: bool },
    GetConnectedDevices,
    ListDevices,
    RestartService,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Profile { profile: ProfileInfo },
    Ready { ready: bool },
    Accepted { accepted: bool },
    Status { peer: PeerConnectionState, summary: String },
    Preferred { preferred: bool, priority: Priority },
    Devices { devices: Vec<PeerAddress> },
    CachedDevices { devices: Vec<DeviceSnapshot> },
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub name: String,
    pub display_name: String,
    pub ordinal: i32,
    pub uuids: Vec<String>,
    pub ready: bool,
    pub connectable: bool,
    pub auto_connectable: bool,
}

pub struct IpcServer {
    listener: UnixListener,
    context: Rc<DaemonContext>,
}

impl IpcServer {
    pub fn new(listener: UnixListener, context: Rc<DaemonContext>) -> Self {
        Self { listener, context }
    }

    /// Accepts clients forever. Must run inside a `LocalSet`; clients are
    /// served on the same thread as the profile controller.
    pub async fn run(self) -> Result<()> {
        tracing::info!("IPC server listening for connections...");

        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    tracing::debug!("New client connected");
                    let context = self.context.clone();

                    tokio::task::spawn_local(async move {
                        if let Err(e) = handle_client(stream, context).await {
                            tracing::error!("Client error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

async fn handle_client(stream: UnixStream, context: Rc<DaemonContext>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        tracing::debug!("Received request: {}", request);

        let response = match serde_json::from_str::<Request>(request) {
            Ok(request) => context.handle(request),
            Err(e) => Response::Error { message: format!("invalid request: {}", e) },
        };

        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        writer.write_all(payload.as_bytes()).await?;
    }

    tracing::debug!("Client disconnected");
    Ok(())
}

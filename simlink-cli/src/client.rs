/*!
 * SIMLINK Daemon Client
 * JSON IPC communication with simlinkd
 */

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use simlink_daemon::ipc::{Request, Response};

pub struct SimlinkClient {
    socket_path: String,
}

impl SimlinkClient {
    pub fn new(socket_path: String) -> Self {
        Self { socket_path }
    }

    pub async fn send_request(&self, request: Request) -> Result<Response> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .with_context(|| format!("connecting to simlinkd at {}", self.socket_path))?;
        let (reader, mut writer) = stream.into_split();

        let mut request_json = serde_json::to_string(&request)?;
        request_json.push('\n');
        writer.write_all(request_json.as_bytes()).await?;

        let mut lines = BufReader::new(reader).lines();
        let Some(line) = lines.next_line().await? else {
            bail!("simlinkd closed the connection without answering");
        };

        Ok(serde_json::from_str(&line)?)
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::loopback::LoopbackPeer;
use crate::profile::ProfileConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    pub socket_path: String,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub loopback: LoopbackConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoopbackConfig {
    #[serde(default)]
    pub bind_delay_ms: u64,
    #[serde(default)]
    pub peers: Vec<LoopbackPeer>,
}

impl LoopbackConfig {
    pub fn bind_delay(&self) -> Duration {
        Duration::from_millis(self.bind_delay_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: "/run/simlink/simlink.sock".to_string(),
            profile: ProfileConfig::default(),
            loopback: LoopbackConfig { bind_delay_ms: 250, peers: Vec::new() },
        }
    }
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Create default config if not found
                let config = Self::default();
                if let Err(e) = fs::write(path, toml::to_string_pretty(&config)?) {
                    tracing::debug!("Not writing default config to {}: {}", path.display(), e);
                }
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }
}

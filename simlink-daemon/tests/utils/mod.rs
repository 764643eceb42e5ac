#![allow(dead_code)]

use std::future::Future;

use tokio::task::LocalSet;

use simlink_daemon::config::LoopbackConfig;
use simlink_daemon::loopback::LoopbackPeer;
use simlink_daemon::profile::ProfileConfig;
use simlink_daemon::DaemonConfig;

pub fn start_test(f: impl Future<Output = ()>) {
    tokio_test::block_on(async move {
        init_logging();
        LocalSet::new().run_until(f).await;
    });
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("simlink_daemon=debug")
        .try_init();
}

/// Lets spawned local tasks (the binding pump, IPC clients) make progress.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn config_with_peers(socket_path: &str, peers: Vec<LoopbackPeer>) -> DaemonConfig {
    config_with_bind_delay(socket_path, 0, peers)
}

pub fn config_with_bind_delay(
    socket_path: &str,
    bind_delay_ms: u64,
    peers: Vec<LoopbackPeer>,
) -> DaemonConfig {
    DaemonConfig {
        socket_path: socket_path.to_string(),
        profile: ProfileConfig::default(),
        loopback: LoopbackConfig { bind_delay_ms, peers },
    }
}

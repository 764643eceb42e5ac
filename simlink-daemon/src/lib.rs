/*!
 * SIMLINK SIM Access Profile Daemon
 * Profile connection control for a single SAP peer
 * Onyx Digital Intelligence Development LLC
 */

pub mod config;
pub mod daemon;
pub mod device_cache;
pub mod error;
pub mod ipc;
pub mod loopback;
pub mod manager;
pub mod profile;

pub use config::DaemonConfig;
pub use daemon::{Daemon, DaemonContext};
pub use profile::{LocalBluetoothProfile, PeerAddress, SapProfile};

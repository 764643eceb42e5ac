/*!
 * Cached Bluetooth Devices
 * In-process registry of known peers and their per-profile state
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::profile::{
    CachedDevice, DeviceRegistry, LocalBluetoothProfile, PeerAddress, ProfileConnectionState,
};

pub struct CachedBluetoothDevice {
    address: PeerAddress,
    inner: RefCell<CachedDeviceState>,
}

#[derive(Default)]
struct CachedDeviceState {
    profile_states: HashMap<&'static str, ProfileConnectionState>,
    summary: Option<ProfileConnectionState>,
    refresh_count: u32,
    last_refresh: Option<DateTime<Utc>>,
}

/// Serializable view of a cached device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub address: PeerAddress,
    pub summary: ProfileConnectionState,
    pub profiles: BTreeMap<String, ProfileConnectionState>,
    pub refresh_count: u32,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl CachedBluetoothDevice {
    pub fn new(address: PeerAddress) -> Self {
        Self { address, inner: RefCell::new(CachedDeviceState::default()) }
    }

    pub fn address(&self) -> PeerAddress {
        self.address
    }

    pub fn profile_state(&self, profile: &str) -> Option<ProfileConnectionState> {
        self.inner.borrow().profile_states.get(profile).copied()
    }

    /// Summary as of the last refresh.
    pub fn summary(&self) -> ProfileConnectionState {
        self.inner.borrow().summary.unwrap_or(ProfileConnectionState::Disconnected)
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let inner = self.inner.borrow();
        DeviceSnapshot {
            address: self.address,
            summary: inner.summary.unwrap_or(ProfileConnectionState::Disconnected),
            profiles: inner
                .profile_states
                .iter()
                .map(|(name, state)| (name.to_string(), *state))
                .collect(),
            refresh_count: inner.refresh_count,
            last_refresh: inner.last_refresh,
        }
    }
}

fn summarize<'a>(
    states: impl Iterator<Item = &'a ProfileConnectionState>,
) -> ProfileConnectionState {
    let rank = |state: &ProfileConnectionState| match state {
        ProfileConnectionState::Connected => 3,
        ProfileConnectionState::Connecting => 2,
        ProfileConnectionState::Disconnecting => 1,
        ProfileConnectionState::Disconnected => 0,
    };
    states.max_by_key(|s| rank(s)).copied().unwrap_or(ProfileConnectionState::Disconnected)
}

impl CachedDevice for CachedBluetoothDevice {
    fn on_profile_state_changed(
        &self,
        profile: &dyn LocalBluetoothProfile,
        state: ProfileConnectionState,
    ) {
        tracing::debug!("{}: {} profile is now {}", self.address, profile.name(), state);
        self.inner.borrow_mut().profile_states.insert(profile.name(), state);
    }

    fn refresh(&self) {
        let mut inner = self.inner.borrow_mut();
        let summary = summarize(inner.profile_states.values());
        inner.summary = Some(summary);
        inner.refresh_count += 1;
        inner.last_refresh = Some(Utc::now());
        tracing::debug!("{}: refreshed, summary {}", self.address, summary);
    }
}

/// Registry of every peer the daemon has heard of.
#[derive(Default)]
pub struct DeviceCache {
    devices: RefCell<BTreeMap<PeerAddress, Rc<CachedBluetoothDevice>>>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &PeerAddress) -> Option<Rc<CachedBluetoothDevice>> {
        self.devices.borrow().get(address).cloned()
    }

    /// Snapshots of all devices, ordered by address.
    pub fn devices(&self) -> Vec<DeviceSnapshot> {
        self.devices.borrow().values().map(|d| d.snapshot()).collect()
    }
}

impl DeviceRegistry for DeviceCache {
    fn find_device(&self, address: &PeerAddress) -> Option<Rc<dyn CachedDevice>> {
        self.get(address).map(|d| d as Rc<dyn CachedDevice>)
    }

    fn add_device(&self, address: &PeerAddress) -> Rc<dyn CachedDevice> {
        let device = self
            .devices
            .borrow_mut()
            .entry(*address)
            .or_insert_with(|| {
                tracing::info!("Adding device {}", address);
                Rc::new(CachedBluetoothDevice::new(*address))
            })
            .clone();
        device
    }
}

/*!
 * Bluetooth Profile Abstractions
 * Connection state, priority and the ports a profile controller talks to
 */

pub mod address;
pub mod binding;
pub mod resources;
pub mod sap;
pub mod uuids;

#[cfg(test)]
pub mod mocks;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

pub use address::PeerAddress;
pub use binding::{BindingEvent, BindingState, SapService, ServiceBindingChannel};
pub use resources::{DrawableResource, NameResource, SummaryResource};
pub use sap::{ProfileConfig, SapProfile};

/// Connection state of a single peer for a single profile.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ProfileConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileConnectionState::Disconnected => write!(f, "Disconnected"),
            ProfileConnectionState::Connecting => write!(f, "Connecting"),
            ProfileConnectionState::Connected => write!(f, "Connected"),
            ProfileConnectionState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Raw per-peer priority level. The transport auto-connects peers whose
/// priority is above `OFF`.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const UNDEFINED: Self = Self(-1);
    pub const OFF: Self = Self(0);
    pub const ON: Self = Self(100);
    pub const AUTO_CONNECT: Self = Self(1000);

    pub fn tier(&self) -> PriorityTier {
        if *self <= Self::OFF {
            PriorityTier::Off
        } else if *self >= Self::AUTO_CONNECT {
            PriorityTier::Auto
        } else {
            PriorityTier::On
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

/// Priority abstracted to what it means for auto-connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityTier {
    /// Never auto-connect
    Off,
    /// Auto-connect allowed
    On,
    /// Preferred auto-connect target
    Auto,
}

/// Snapshot of one peer as seen through a profile. Derived from service
/// queries, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConnectionState {
    pub device: PeerAddress,
    pub status: ProfileConnectionState,
    pub priority: Priority,
}

/// A profile that can be queried and controlled by peer address.
///
/// Implemented by every profile variant so the profile manager can hold a
/// uniform collection of them.
pub trait LocalBluetoothProfile {
    fn is_connectable(&self) -> bool;

    fn is_auto_connectable(&self) -> bool;

    /// Whether the backing service is bound and usable.
    fn is_profile_ready(&self) -> bool;

    /// Requests a connection. The return value is the service's immediate
    /// accept/reject, not the final connection outcome.
    fn connect(&self, device: &PeerAddress) -> bool;

    fn disconnect(&self, device: &PeerAddress) -> bool;

    fn connection_status(&self, device: &PeerAddress) -> ProfileConnectionState;

    fn is_preferred(&self, device: &PeerAddress) -> bool;

    fn preferred(&self, device: &PeerAddress) -> Priority;

    fn set_preferred(&self, device: &PeerAddress, preferred: bool);

    fn connected_devices(&self) -> Vec<PeerAddress>;

    fn name(&self) -> &'static str;

    /// Display order among the profiles of a device.
    fn ordinal(&self) -> i32;

    fn uuids(&self) -> &'static [Uuid];

    fn name_resource(&self, device: &PeerAddress) -> NameResource;

    fn summary_resource_for_device(&self, device: &PeerAddress) -> SummaryResource;

    fn drawable_resource(&self, class_of_device: u32) -> DrawableResource;
}

/// Cached per-peer state owned by the device registry.
pub trait CachedDevice {
    fn on_profile_state_changed(
        &self,
        profile: &dyn LocalBluetoothProfile,
        state: ProfileConnectionState,
    );

    /// Recomputes the cached summary shown for this peer.
    fn refresh(&self);
}

/// Lookup and registration of known peers.
pub trait DeviceRegistry {
    fn find_device(&self, address: &PeerAddress) -> Option<Rc<dyn CachedDevice>>;

    fn add_device(&self, address: &PeerAddress) -> Rc<dyn CachedDevice>;
}

/// Profile-manager level listeners interested in service availability.
pub trait ProfileServiceNotifier {
    fn call_service_connected_listeners(&self);

    fn call_service_disconnected_listeners(&self);
}

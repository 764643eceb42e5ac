/*!
 * SIM Access Profile
 * Tracks the SAP service binding and exposes connect/disconnect/priority per peer
 */

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::binding::{
    BindingEvent, BindingEventReceiver, BindingState, SapService, ServiceBindingChannel,
};
use super::resources::{DrawableResource, NameResource, SummaryResource};
use super::{
    uuids, DeviceRegistry, LocalBluetoothProfile, PeerAddress, PeerConnectionState, Priority,
    ProfileConnectionState, ProfileServiceNotifier,
};

pub const NAME: &str = "SAP";

// Order of this profile in device profiles list
const ORDINAL: i32 = 10;

static UUIDS: [Uuid; 1] = [uuids::SAP];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Log binding transitions and teardown at debug level
    pub verbose_logging: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { verbose_logging: true }
    }
}

/// Controller for the SIM Access Profile.
///
/// Not thread-safe: every call and every binding event must run on the same
/// execution context. Only one peer may be active for this profile, so
/// connecting a peer first disconnects whoever is connected.
pub struct SapProfile {
    config: ProfileConfig,
    state: BindingState,
    service: Option<Box<dyn SapService>>,
    ready: bool,
    closed: bool,
    channel: Box<dyn ServiceBindingChannel>,
    device_manager: Rc<dyn DeviceRegistry>,
    profile_manager: Rc<dyn ProfileServiceNotifier>,
}

impl SapProfile {
    /// Creates the controller and immediately requests the service binding.
    /// The returned receiver carries binding events, which the owner must
    /// feed back through [`SapProfile::handle_binding_event`].
    pub fn new(
        config: ProfileConfig,
        mut channel: Box<dyn ServiceBindingChannel>,
        device_manager: Rc<dyn DeviceRegistry>,
        profile_manager: Rc<dyn ProfileServiceNotifier>,
    ) -> (Self, BindingEventReceiver) {
        let (tx, rx) = unbounded_channel();
        if let Err(e) = channel.bind(tx) {
            warn!("Failed to request SAP service binding: {}", e);
        }

        let profile = Self {
            config,
            state: BindingState::Unbound,
            service: None,
            ready: false,
            closed: false,
            channel,
            device_manager,
            profile_manager,
        };
        (profile, rx)
    }

    pub fn binding_state(&self) -> BindingState {
        self.state
    }

    pub fn handle_binding_event(&mut self, event: BindingEvent) {
        if self.closed {
            if let BindingEvent::Bound(service) = event {
                debug!("SAP service bound after close, releasing it");
                self.release(service);
            }
            return;
        }

        self.state = self.state.next(&event);
        match event {
            BindingEvent::Bound(service) => self.on_service_connected(service),
            BindingEvent::Unbound => self.on_service_disconnected(),
        }
    }

    fn on_service_connected(&mut self, service: Box<dyn SapService>) {
        if self.config.verbose_logging {
            debug!("Bluetooth service connected");
        }

        if let Some(previous) = self.service.take() {
            warn!("SAP service bound twice without unbind, releasing previous handle");
            self.ready = false;
            self.release(previous);
        }

        // We just bound to the service, so refresh any connected SAP devices.
        let devices = service.get_connected_devices();
        self.service = Some(service);
        self.replay_connected_devices(&devices);

        self.profile_manager.call_service_connected_listeners();
        self.ready = true;
    }

    fn replay_connected_devices(&self, devices: &[PeerAddress]) {
        for address in devices {
            let device = match self.device_manager.find_device(address) {
                Some(device) => device,
                None => {
                    // should not normally happen, the registry learns of peers first
                    warn!("SapProfile found new device: {}", address);
                    self.device_manager.add_device(address)
                }
            };
            device.on_profile_state_changed(self, ProfileConnectionState::Connected);
            device.refresh();
        }
    }

    fn on_service_disconnected(&mut self) {
        if self.config.verbose_logging {
            debug!("Bluetooth service disconnected");
        }
        self.profile_manager.call_service_disconnected_listeners();
        self.ready = false;
        self.service = None;
    }

    /// Releases the service handle, if one is held. Safe to call more than
    /// once; later bindings are released as soon as they arrive.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.config.verbose_logging {
            debug!("close()");
        }
        self.closed = true;
        self.ready = false;
        self.state = BindingState::Unbound;
        if let Some(service) = self.service.take() {
            self.release(service);
        }
    }

    fn release(&mut self, service: Box<dyn SapService>) {
        match self.channel.unbind(service) {
            Ok(()) => info!("Released SAP service handle"),
            Err(e) => warn!("Error cleaning up SAP proxy: {}", e),
        }
    }

    pub fn peer_state(&self, device: &PeerAddress) -> PeerConnectionState {
        PeerConnectionState {
            device: *device,
            status: self.connection_status(device),
            priority: self.preferred(device),
        }
    }
}

impl Drop for SapProfile {
    fn drop(&mut self) {
        self.close();
    }
}

impl LocalBluetoothProfile for SapProfile {
    fn is_connectable(&self) -> bool {
        true
    }

    fn is_auto_connectable(&self) -> bool {
        true
    }

    fn is_profile_ready(&self) -> bool {
        self.ready
    }

    fn connect(&self, device: &PeerAddress) -> bool {
        let Some(service) = self.service.as_deref() else {
            return false;
        };
        for sink in service.get_connected_devices() {
            service.disconnect(&sink);
        }
        service.connect(device)
    }

    fn disconnect(&self, device: &PeerAddress) -> bool {
        let Some(service) = self.service.as_deref() else {
            return false;
        };
        let devices = service.get_connected_devices();
        if devices.first() != Some(device) {
            return false;
        }
        // Keep an elevated priority from forcing a reconnect right away.
        if service.get_priority(device) > Priority::ON {
            service.set_priority(device, Priority::ON);
        }
        service.disconnect(device)
    }

    fn connection_status(&self, device: &PeerAddress) -> ProfileConnectionState {
        let Some(service) = self.service.as_deref() else {
            return ProfileConnectionState::Disconnected;
        };
        let devices = service.get_connected_devices();
        if devices.first() == Some(device) {
            service.get_connection_state(device)
        } else {
            ProfileConnectionState::Disconnected
        }
    }

    fn is_preferred(&self, device: &PeerAddress) -> bool {
        match self.service.as_deref() {
            Some(service) => service.get_priority(device) > Priority::OFF,
            None => false,
        }
    }

    fn preferred(&self, device: &PeerAddress) -> Priority {
        match self.service.as_deref() {
            Some(service) => service.get_priority(device),
            None => Priority::OFF,
        }
    }

    fn set_preferred(&self, device: &PeerAddress, preferred: bool) {
        let Some(service) = self.service.as_deref() else {
            return;
        };
        if preferred {
            if service.get_priority(device) < Priority::ON {
                service.set_priority(device, Priority::ON);
            }
        } else {
            service.set_priority(device, Priority::OFF);
        }
    }

    fn connected_devices(&self) -> Vec<PeerAddress> {
        match self.service.as_deref() {
            Some(service) => service.get_devices_matching_connection_states(&[
                ProfileConnectionState::Connected,
                ProfileConnectionState::Connecting,
                ProfileConnectionState::Disconnecting,
            ]),
            None => Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn ordinal(&self) -> i32 {
        ORDINAL
    }

    fn uuids(&self) -> &'static [Uuid] {
        &UUIDS
    }

    fn name_resource(&self, _device: &PeerAddress) -> NameResource {
        NameResource::SapProfile
    }

    fn summary_resource_for_device(&self, device: &PeerAddress) -> SummaryResource {
        SummaryResource::for_sap_state(self.connection_status(device))
    }

    fn drawable_resource(&self, _class_of_device: u32) -> DrawableResource {
        DrawableResource::Cellphone
    }
}

//! Mocked collaborators of a profile controller for use in test. Calls are
//! routed into channels so tests can assert on their exact order.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::binding::{BindingEvent, BindingEventSender, SapService, ServiceBindingChannel};
use super::{
    CachedDevice, DeviceRegistry, LocalBluetoothProfile, PeerAddress, Priority,
    ProfileConnectionState, ProfileServiceNotifier,
};
use crate::error::BindingError;

/// Events representing calls to SapService
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockSapEvents {
    GetConnectedDevices,
    Connect(PeerAddress),
    Disconnect(PeerAddress),
    GetConnectionState(PeerAddress),
    GetPriority(PeerAddress),
    SetPriority(PeerAddress, Priority),
    GetDevicesMatchingConnectionStates(Vec<ProfileConnectionState>),
}

#[derive(Default)]
struct MockSapState {
    connected: Vec<PeerAddress>,
    states: HashMap<PeerAddress, ProfileConnectionState>,
    priorities: HashMap<PeerAddress, Priority>,
    reject_connect: bool,
}

/// Scripted SapService. Clones share state, so a test can keep one clone
/// while the controller owns another.
#[derive(Clone)]
pub struct MockSapService {
    tx: UnboundedSender<MockSapEvents>,
    state: Rc<RefCell<MockSapState>>,
}

impl MockSapService {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockSapEvents>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx, state: Rc::new(RefCell::new(MockSapState::default())) }, rx)
    }

    /// Sets the connected-device list, marking each entry Connected.
    pub fn set_connected(&self, devices: Vec<PeerAddress>) {
        let mut state = self.state.borrow_mut();
        for device in &devices {
            state.states.insert(*device, ProfileConnectionState::Connected);
        }
        state.connected = devices;
    }

    pub fn set_connection_state(&self, device: PeerAddress, connection: ProfileConnectionState) {
        self.state.borrow_mut().states.insert(device, connection);
    }

    pub fn set_priority_value(&self, device: PeerAddress, priority: Priority) {
        self.state.borrow_mut().priorities.insert(device, priority);
    }

    pub fn priority_of(&self, device: &PeerAddress) -> Priority {
        self.state.borrow().priorities.get(device).copied().unwrap_or_default()
    }

    pub fn set_accept(&self, accept: bool) {
        self.state.borrow_mut().reject_connect = !accept;
    }

    fn record(&self, event: MockSapEvents) {
        let _ = self.tx.send(event);
    }
}

impl SapService for MockSapService {
    fn get_connected_devices(&self) -> Vec<PeerAddress> {
        self.record(MockSapEvents::GetConnectedDevices);
        self.state.borrow().connected.clone()
    }

    fn connect(&self, device: &PeerAddress) -> bool {
        self.record(MockSapEvents::Connect(*device));
        !self.state.borrow().reject_connect
    }

    fn disconnect(&self, device: &PeerAddress) -> bool {
        self.record(MockSapEvents::Disconnect(*device));
        let mut state = self.state.borrow_mut();
        state.connected.retain(|d| d != device);
        state.states.insert(*device, ProfileConnectionState::Disconnected);
        true
    }

    fn get_connection_state(&self, device: &PeerAddress) -> ProfileConnectionState {
        self.record(MockSapEvents::GetConnectionState(*device));
        self.state
            .borrow()
            .states
            .get(device)
            .copied()
            .unwrap_or(ProfileConnectionState::Disconnected)
    }

    fn get_priority(&self, device: &PeerAddress) -> Priority {
        self.record(MockSapEvents::GetPriority(*device));
        self.priority_of(device)
    }

    fn set_priority(&self, device: &PeerAddress, priority: Priority) {
        self.record(MockSapEvents::SetPriority(*device, priority));
        self.state.borrow_mut().priorities.insert(*device, priority);
    }

    fn get_devices_matching_connection_states(
        &self,
        states: &[ProfileConnectionState],
    ) -> Vec<PeerAddress> {
        self.record(MockSapEvents::GetDevicesMatchingConnectionStates(states.to_vec()));
        let mut devices: Vec<PeerAddress> = self
            .state
            .borrow()
            .states
            .iter()
            .filter(|(_, s)| states.contains(s))
            .map(|(d, _)| *d)
            .collect();
        devices.sort();
        devices
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Events representing calls to ServiceBindingChannel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBindingEvents {
    Bind,
    Unbind,
}

#[derive(Default)]
struct MockBindingState {
    events: Option<BindingEventSender>,
    bind_error: Option<BindingError>,
    unbind_error: Option<BindingError>,
}

#[derive(Clone)]
pub struct MockBindingChannel {
    tx: UnboundedSender<MockBindingEvents>,
    state: Rc<RefCell<MockBindingState>>,
}

impl MockBindingChannel {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockBindingEvents>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx, state: Rc::new(RefCell::new(MockBindingState::default())) }, rx)
    }

    pub fn fail_bind(&self, error: BindingError) {
        self.state.borrow_mut().bind_error = Some(error);
    }

    pub fn fail_unbind(&self, error: BindingError) {
        self.state.borrow_mut().unbind_error = Some(error);
    }

    /// Sends an event to whoever called bind().
    pub fn deliver(&self, event: BindingEvent) {
        let state = self.state.borrow();
        let events = state.events.as_ref().expect("bind() was never called");
        events.send(event).ok().expect("binding receiver dropped");
    }
}

impl ServiceBindingChannel for MockBindingChannel {
    fn bind(&mut self, events: BindingEventSender) -> Result<(), BindingError> {
        let _ = self.tx.send(MockBindingEvents::Bind);
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.bind_error.clone() {
            return Err(error);
        }
        state.events = Some(events);
        Ok(())
    }

    fn unbind(&mut self, _service: Box<dyn SapService>) -> Result<(), BindingError> {
        let _ = self.tx.send(MockBindingEvents::Unbind);
        match self.state.borrow().unbind_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Events representing calls to DeviceRegistry and the devices it hands out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRegistryEvents {
    FindDevice(PeerAddress),
    AddDevice(PeerAddress),
    ProfileStateChanged(PeerAddress, &'static str, ProfileConnectionState),
    Refresh(PeerAddress),
}

pub struct MockDeviceRegistry {
    tx: UnboundedSender<MockRegistryEvents>,
    known: RefCell<HashSet<PeerAddress>>,
}

impl MockDeviceRegistry {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockRegistryEvents>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx, known: RefCell::new(HashSet::new()) }, rx)
    }

    pub fn insert_known(&self, address: PeerAddress) {
        self.known.borrow_mut().insert(address);
    }

    fn device(&self, address: &PeerAddress) -> Rc<dyn CachedDevice> {
        Rc::new(MockCachedDevice { address: *address, tx: self.tx.clone() })
    }
}

impl DeviceRegistry for MockDeviceRegistry {
    fn find_device(&self, address: &PeerAddress) -> Option<Rc<dyn CachedDevice>> {
        let _ = self.tx.send(MockRegistryEvents::FindDevice(*address));
        if self.known.borrow().contains(address) {
            Some(self.device(address))
        } else {
            None
        }
    }

    fn add_device(&self, address: &PeerAddress) -> Rc<dyn CachedDevice> {
        let _ = self.tx.send(MockRegistryEvents::AddDevice(*address));
        self.known.borrow_mut().insert(*address);
        self.device(address)
    }
}

struct MockCachedDevice {
    address: PeerAddress,
    tx: UnboundedSender<MockRegistryEvents>,
}

impl CachedDevice for MockCachedDevice {
    fn on_profile_state_changed(
        &self,
        profile: &dyn LocalBluetoothProfile,
        state: ProfileConnectionState,
    ) {
        let _ = self.tx.send(MockRegistryEvents::ProfileStateChanged(
            self.address,
            profile.name(),
            state,
        ));
    }

    fn refresh(&self) {
        let _ = self.tx.send(MockRegistryEvents::Refresh(self.address));
    }
}

/// Events representing calls to ProfileServiceNotifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockNotifierEvents {
    ServiceConnected,
    ServiceDisconnected,
}

pub struct MockNotifier(UnboundedSender<MockNotifierEvents>);

impl MockNotifier {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockNotifierEvents>) {
        let (tx, rx) = unbounded_channel();
        (Self(tx), rx)
    }
}

impl ProfileServiceNotifier for MockNotifier {
    fn call_service_connected_listeners(&self) {
        let _ = self.0.send(MockNotifierEvents::ServiceConnected);
    }

    fn call_service_disconnected_listeners(&self) {
        let _ = self.0.send(MockNotifierEvents::ServiceDisconnected);
    }
}

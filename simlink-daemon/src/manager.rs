/*!
 * Local Profile Manager
 * Keeps the profile list and fans out service availability to listeners
 */

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

use crate::profile::{LocalBluetoothProfile, ProfileServiceNotifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceEvent {
    Connected,
    Disconnected,
}

type ServiceListener = Box<dyn Fn(ServiceEvent)>;

/// Listeners notified when a profile's backing service comes and goes.
#[derive(Default)]
pub struct ServiceListeners {
    listeners: RefCell<Vec<ServiceListener>>,
}

impl ServiceListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Listeners run from inside the profile's binding
    /// event handling, while the profile is mutably borrowed, so they must
    /// not borrow the profile themselves.
    pub fn add_listener(&self, listener: impl Fn(ServiceEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    fn dispatch(&self, event: ServiceEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }
}

impl ProfileServiceNotifier for ServiceListeners {
    fn call_service_connected_listeners(&self) {
        self.dispatch(ServiceEvent::Connected);
    }

    fn call_service_disconnected_listeners(&self) {
        self.dispatch(ServiceEvent::Disconnected);
    }
}

pub type SharedProfile = Rc<RefCell<dyn LocalBluetoothProfile>>;

/// Uniform collection of profile controllers, kept in display order.
///
/// Profiles only see the `ServiceListeners`, never the manager itself, so
/// dropping the manager drops (and tears down) its profiles.
#[derive(Default)]
pub struct LocalProfileManager {
    profiles: Vec<SharedProfile>,
    listeners: Rc<ServiceListeners>,
}

impl LocalProfileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners(&self) -> Rc<ServiceListeners> {
        self.listeners.clone()
    }

    pub fn add_profile(&mut self, profile: SharedProfile) {
        info!("Registering {} profile", profile.borrow().name());
        self.profiles.push(profile);
        self.profiles.sort_by_key(|p| p.borrow().ordinal());
    }

    pub fn find_profile_by_name(&self, name: &str) -> Option<SharedProfile> {
        self.profiles.iter().find(|p| p.borrow().name().eq_ignore_ascii_case(name)).cloned()
    }
}

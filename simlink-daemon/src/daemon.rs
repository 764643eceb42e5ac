/*!
 * Daemon Assembly
 * Wires the SAP profile to its transport, device cache and IPC requests
 */

use std::cell::RefCell;
use std::rc::Rc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::device_cache::DeviceCache;
use crate::ipc::{ProfileInfo, Request, Response};
use crate::loopback::LoopbackBinder;
use crate::manager::{LocalProfileManager, ServiceEvent};
use crate::profile::binding::BindingEventReceiver;
use crate::profile::{LocalBluetoothProfile, PeerAddress, SapProfile};

/// State shared by every IPC client. Lives on the daemon's single thread.
pub struct DaemonContext {
    pub profile: Rc<RefCell<SapProfile>>,
    pub devices: Rc<DeviceCache>,
    pub binder: LoopbackBinder,
}

impl DaemonContext {
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetProfile => Response::Profile { profile: self.profile_info() },
            Request::IsReady => {
                Response::Ready { ready: self.profile.borrow().is_profile_ready() }
            }
            Request::Connect { address } => self.with_address(&address, |profile, device| {
                Response::Accepted { accepted: profile.connect(device) }
            }),
            Request::Disconnect { address } => self.with_address(&address, |profile, device| {
                Response::Accepted { accepted: profile.disconnect(device) }
            }),
            Request::GetConnectionStatus { address } => {
                self.with_address(&address, |profile, device| Response::Status {
                    peer: profile.peer_state(device),
                    summary: profile.summary_resource_for_device(device).as_str().to_string(),
                })
            }
            Request::GetPreferred { address } => self.with_address(&address, preferred_response),
            Request::SetPreferred { address, preferred } => {
                self.with_address(&address, |profile, device| {
                    profile.set_preferred(device, preferred);
                    preferred_response(profile, device)
                })
            }
            Request::GetConnectedDevices => {
                Response::Devices { devices: self.profile.borrow().connected_devices() }
            }
            Request::ListDevices => Response::CachedDevices { devices: self.devices.devices() },
            Request::RestartService => {
                self.binder.simulate_crash();
                self.binder.rebind();
                Response::Success { message: "SAP service restart requested".to_string() }
            }
        }
    }

    fn with_address(
        &self,
        address: &str,
        f: impl FnOnce(&SapProfile, &PeerAddress) -> Response,
    ) -> Response {
        match address.parse::<PeerAddress>() {
            Ok(device) => f(&*self.profile.borrow(), &device),
            Err(e) => Response::Error { message: e.to_string() },
        }
    }

    fn profile_info(&self) -> ProfileInfo {
        let profile = self.profile.borrow();
        ProfileInfo {
            name: profile.name().to_string(),
            display_name: profile.name_resource(&PeerAddress::EMPTY).as_str().to_string(),
            ordinal: profile.ordinal(),
            uuids: profile.uuids().iter().map(|u| u.to_string().to_uppercase()).collect(),
            ready: profile.is_profile_ready(),
            connectable: profile.is_connectable(),
            auto_connectable: profile.is_auto_connectable(),
        }
    }
}

fn preferred_response(profile: &SapProfile, device: &PeerAddress) -> Response {
    Response::Preferred {
        preferred: profile.is_preferred(device),
        priority: profile.preferred(device),
    }
}

/// Feeds binding events into the profile, one at a time, on the current thread.
pub async fn pump_binding_events(
    profile: Rc<RefCell<SapProfile>>,
    mut events: BindingEventReceiver,
) {
    while let Some(event) = events.recv().await {
        debug!("SAP binding event: {:?}", event);
        profile.borrow_mut().handle_binding_event(event);
    }
    warn!("SAP binding channel closed");
}

/// A running profile session. Must be created and dropped inside a
/// `LocalSet`.
pub struct Daemon {
    context: Rc<DaemonContext>,
    manager: LocalProfileManager,
    pump: JoinHandle<()>,
}

impl Daemon {
    pub fn start(config: &DaemonConfig) -> Self {
        let mut manager = LocalProfileManager::new();
        let listeners = manager.listeners();
        listeners.add_listener(|event| match event {
            ServiceEvent::Connected => info!("SAP service available"),
            ServiceEvent::Disconnected => warn!("SAP service unavailable"),
        });

        let devices = Rc::new(DeviceCache::new());
        let binder = LoopbackBinder::new(&config.loopback.peers, config.loopback.bind_delay());
        let (profile, events) = SapProfile::new(
            config.profile.clone(),
            Box::new(binder.clone()),
            devices.clone(),
            listeners,
        );
        let profile = Rc::new(RefCell::new(profile));
        let pump = tokio::task::spawn_local(pump_binding_events(profile.clone(), events));

        manager.add_profile(profile.clone());

        let context = Rc::new(DaemonContext { profile, devices, binder });
        Self { context, manager, pump }
    }

    pub fn context(&self) -> Rc<DaemonContext> {
        self.context.clone()
    }

    pub fn manager(&self) -> &LocalProfileManager {
        &self.manager
    }

    /// Releases the service handle and stops processing binding events.
    pub fn shutdown(self) {
        info!("Shutting down SAP profile");
        self.pump.abort();
        self.context.profile.borrow_mut().close();
    }
}

/*!
 * Loopback Transport
 * In-memory SAP service so the daemon can run without a radio
 */

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::BindingError;
use crate::profile::binding::{BindingEvent, BindingEventSender, SapService, ServiceBindingChannel};
use crate::profile::{PeerAddress, Priority, ProfileConnectionState};

/// A peer the loopback transport knows about at startup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoopbackPeer {
    pub address: PeerAddress,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy)]
struct PeerEntry {
    state: ProfileConnectionState,
    priority: Priority,
}

impl Default for PeerEntry {
    fn default() -> Self {
        Self { state: ProfileConnectionState::Disconnected, priority: Priority::UNDEFINED }
    }
}

#[derive(Default)]
struct LoopbackState {
    peers: BTreeMap<PeerAddress, PeerEntry>,
    // Generation of the handle currently handed out, if any
    bound: Option<u64>,
    // A Bound delivery is scheduled but has not landed yet
    pending: bool,
    next_generation: u64,
    events: Option<BindingEventSender>,
}

/// Service handle handed out on bind. Stops answering once it is released
/// or the transport goes away.
pub struct LoopbackSapService {
    state: Rc<RefCell<LoopbackState>>,
    generation: u64,
}

impl LoopbackSapService {
    fn live(&self) -> bool {
        let live = self.state.borrow().bound == Some(self.generation);
        if !live {
            warn!("Call on stale SAP service handle (generation {})", self.generation);
        }
        live
    }
}

impl SapService for LoopbackSapService {
    fn get_connected_devices(&self) -> Vec<PeerAddress> {
        self.get_devices_matching_connection_states(&[ProfileConnectionState::Connected])
    }

    fn connect(&self, device: &PeerAddress) -> bool {
        if !self.live() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        let busy = state.peers.iter().any(|(address, entry)| {
            address != device && entry.state != ProfileConnectionState::Disconnected
        });
        if busy {
            debug!("Rejecting connect to {}, another peer is active", device);
            return false;
        }
        state.peers.entry(*device).or_default().state = ProfileConnectionState::Connected;
        info!("{} connected", device);
        true
    }

    fn disconnect(&self, device: &PeerAddress) -> bool {
        if !self.live() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        match state.peers.get_mut(device) {
            Some(entry) if entry.state != ProfileConnectionState::Disconnected => {
                entry.state = ProfileConnectionState::Disconnected;
                info!("{} disconnected", device);
                true
            }
            _ => false,
        }
    }

    fn get_connection_state(&self, device: &PeerAddress) -> ProfileConnectionState {
        if !self.live() {
            return ProfileConnectionState::Disconnected;
        }
        self.state
            .borrow()
            .peers
            .get(device)
            .map(|e| e.state)
            .unwrap_or(ProfileConnectionState::Disconnected)
    }

    fn get_priority(&self, device: &PeerAddress) -> Priority {
        if !self.live() {
            return Priority::UNDEFINED;
        }
        self.state.borrow().peers.get(device).map(|e| e.priority).unwrap_or_default()
    }

    fn set_priority(&self, device: &PeerAddress, priority: Priority) {
        if !self.live() {
            return;
        }
        debug!("{} priority set to {}", device, priority.0);
        self.state.borrow_mut().peers.entry(*device).or_default().priority = priority;
    }

    fn get_devices_matching_connection_states(
        &self,
        states: &[ProfileConnectionState],
    ) -> Vec<PeerAddress> {
        if !self.live() {
            return Vec::new();
        }
        self.state
            .borrow()
            .peers
            .iter()
            .filter(|(_, entry)| states.contains(&entry.state))
            .map(|(address, _)| *address)
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Binding channel for the loopback transport. Clones share the same
/// transport, so the daemon can keep one to simulate service restarts.
#[derive(Clone)]
pub struct LoopbackBinder {
    state: Rc<RefCell<LoopbackState>>,
    bind_delay: Duration,
}

impl LoopbackBinder {
    pub fn new(peers: &[LoopbackPeer], bind_delay: Duration) -> Self {
        let mut state = LoopbackState::default();
        for peer in peers {
            let connection = if peer.connected {
                ProfileConnectionState::Connected
            } else {
                ProfileConnectionState::Disconnected
            };
            state
                .peers
                .insert(peer.address, PeerEntry { state: connection, priority: peer.priority });
        }
        Self { state: Rc::new(RefCell::new(state)), bind_delay }
    }

    pub fn is_bound(&self) -> bool {
        self.state.borrow().bound.is_some()
    }

    /// Whether a handle is held or about to be delivered.
    fn is_bound_or_pending(&self) -> bool {
        let state = self.state.borrow();
        state.bound.is_some() || state.pending
    }

    /// Transport-side view of a peer, independent of any handle.
    pub fn peer_state(&self, device: &PeerAddress) -> Option<(ProfileConnectionState, Priority)> {
        self.state.borrow().peers.get(device).map(|e| (e.state, e.priority))
    }

    /// Drops the current handle as if the service process died.
    pub fn simulate_crash(&self) {
        let mut state = self.state.borrow_mut();
        if state.bound.take().is_none() {
            return;
        }
        warn!("Loopback SAP service went away");
        if let Some(events) = &state.events {
            let _ = events.send(BindingEvent::Unbound);
        }
    }

    /// Hands out a fresh handle to whoever last called bind(). Does nothing
    /// while a handle is held or already on its way.
    pub fn rebind(&self) {
        if self.is_bound_or_pending() || self.state.borrow().events.is_none() {
            return;
        }
        self.schedule_bound();
    }

    fn schedule_bound(&self) {
        self.state.borrow_mut().pending = true;
        if self.bind_delay.is_zero() {
            deliver_bound(&self.state);
            return;
        }
        let state = self.state.clone();
        let delay = self.bind_delay;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            deliver_bound(&state);
        });
    }
}

fn deliver_bound(state: &Rc<RefCell<LoopbackState>>) {
    let mut inner = state.borrow_mut();
    inner.pending = false;
    let Some(events) = inner.events.clone() else {
        return;
    };
    inner.next_generation += 1;
    let generation = inner.next_generation;
    inner.bound = Some(generation);
    drop(inner);

    let service = LoopbackSapService { state: state.clone(), generation };
    if events.send(BindingEvent::Bound(Box::new(service))).is_err() {
        warn!("SAP binding receiver is gone, dropping handle");
        state.borrow_mut().bound = None;
    } else {
        debug!("Delivered SAP service handle (generation {})", generation);
    }
}

impl ServiceBindingChannel for LoopbackBinder {
    fn bind(&mut self, events: BindingEventSender) -> Result<(), BindingError> {
        if self.is_bound_or_pending() {
            return Err(BindingError::AlreadyBound);
        }
        if events.is_closed() {
            return Err(BindingError::ChannelClosed);
        }
        self.state.borrow_mut().events = Some(events);
        self.schedule_bound();
        Ok(())
    }

    fn unbind(&mut self, service: Box<dyn SapService>) -> Result<(), BindingError> {
        let Some(released) = service.as_any().downcast_ref::<LoopbackSapService>() else {
            return Err(BindingError::NotBound);
        };
        if !Rc::ptr_eq(&released.state, &self.state) {
            return Err(BindingError::NotBound);
        }

        let mut state = self.state.borrow_mut();
        if state.bound != Some(released.generation) {
            debug!("Ignoring release of stale handle (generation {})", released.generation);
            return Ok(());
        }
        state.bound = None;
        state.events = None;
        debug!("Released SAP service handle (generation {})", released.generation);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::mocks::MockSapService;
    use tokio::sync::mpsc::unbounded_channel;

    const PEER_1: PeerAddress = PeerAddress([0xAA, 0, 0, 0, 0, 1]);
    const PEER_2: PeerAddress = PeerAddress([0xAA, 0, 0, 0, 0, 2]);

    fn bound_service(peers: &[LoopbackPeer]) -> (LoopbackBinder, Box<dyn SapService>) {
        let mut binder = LoopbackBinder::new(peers, Duration::ZERO);
        let (tx, mut rx) = unbounded_channel();
        binder.bind(tx).unwrap();
        match rx.try_recv().unwrap() {
            BindingEvent::Bound(service) => (binder, service),
            BindingEvent::Unbound => unreachable!(),
        }
    }

    #[test]
    fn test_initial_peers_are_reported() {
        let (_binder, service) = bound_service(&[
            LoopbackPeer { address: PEER_1, connected: true, priority: Priority::ON },
            LoopbackPeer { address: PEER_2, connected: false, priority: Priority::OFF },
        ]);

        assert_eq!(service.get_connected_devices(), vec![PEER_1]);
        assert_eq!(service.get_priority(&PEER_2), Priority::OFF);
        assert_eq!(service.get_connection_state(&PEER_2), ProfileConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_rejects_second_peer() {
        let (_binder, service) = bound_service(&[]);

        assert!(service.connect(&PEER_1));
        assert!(!service.connect(&PEER_2));
        assert!(service.disconnect(&PEER_1));
        assert!(service.connect(&PEER_2));
        assert_eq!(service.get_connected_devices(), vec![PEER_2]);
    }

    #[test]
    fn test_disconnect_unknown_peer_fails() {
        let (_binder, service) = bound_service(&[]);

        assert!(!service.disconnect(&PEER_1));
    }

    #[test]
    fn test_unbind_releases_handle() {
        let (mut binder, service) = bound_service(&[]);

        binder.unbind(service).unwrap();

        assert!(!binder.is_bound());
    }

    #[test]
    fn test_unbind_rejects_foreign_handles() {
        let (mut binder, _service) = bound_service(&[]);
        let (_other_binder, other) = bound_service(&[]);
        let (mock, _events) = MockSapService::new();

        assert_eq!(binder.unbind(other), Err(BindingError::NotBound));
        assert_eq!(binder.unbind(Box::new(mock)), Err(BindingError::NotBound));
        assert!(binder.is_bound());
    }

    #[test]
    fn test_releasing_stale_handle_keeps_current_one() {
        // arrange
        let mut binder = LoopbackBinder::new(&[], Duration::ZERO);
        let (tx, mut rx) = unbounded_channel();
        binder.bind(tx).unwrap();
        let Ok(BindingEvent::Bound(first)) = rx.try_recv() else { unreachable!() };
        binder.simulate_crash();
        binder.rebind();
        let _ = rx.try_recv();
        let Ok(BindingEvent::Bound(second)) = rx.try_recv() else { unreachable!() };

        // act
        let result = binder.unbind(first);

        // assert
        assert_eq!(result, Ok(()));
        assert!(binder.is_bound());
        assert!(second.connect(&PEER_1));
        binder.simulate_crash();
        assert!(matches!(rx.try_recv(), Ok(BindingEvent::Unbound)));
    }

    #[test]
    fn test_rebind_is_ignored_while_bound() {
        let mut binder = LoopbackBinder::new(&[], Duration::ZERO);
        let (tx, mut rx) = unbounded_channel();
        binder.bind(tx).unwrap();
        assert!(matches!(rx.try_recv(), Ok(BindingEvent::Bound(_))));

        binder.rebind();

        assert!(rx.try_recv().is_err());
        let (tx, _rx) = unbounded_channel();
        assert_eq!(binder.bind(tx), Err(BindingError::AlreadyBound));
    }

    #[test]
    fn test_crash_then_rebind_hands_out_new_handle() {
        // arrange
        let mut binder = LoopbackBinder::new(&[], Duration::ZERO);
        let (tx, mut rx) = unbounded_channel();
        binder.bind(tx).unwrap();
        let Ok(BindingEvent::Bound(first)) = rx.try_recv() else { unreachable!() };

        // act
        binder.simulate_crash();
        binder.rebind();

        // assert
        assert!(matches!(rx.try_recv(), Ok(BindingEvent::Unbound)));
        let Ok(BindingEvent::Bound(second)) = rx.try_recv() else { unreachable!() };
        assert!(!first.connect(&PEER_1));
        assert!(second.connect(&PEER_1));
        assert_eq!(
            binder.peer_state(&PEER_1),
            Some((ProfileConnectionState::Connected, Priority::UNDEFINED))
        );
    }
}

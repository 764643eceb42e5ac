/*!
 * Service Binding
 * Asynchronous acquisition and release of the transport service handle
 */

use std::any::Any;
use std::fmt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use super::{PeerAddress, Priority, ProfileConnectionState};
use crate::error::BindingError;

/// Handle to the transport service backing a profile. Queries reflect state
/// cached in the transport layer and return immediately.
pub trait SapService {
    fn get_connected_devices(&self) -> Vec<PeerAddress>;

    /// Returns whether the request was accepted, not whether it completed.
    fn connect(&self, device: &PeerAddress) -> bool;

    fn disconnect(&self, device: &PeerAddress) -> bool;

    fn get_connection_state(&self, device: &PeerAddress) -> ProfileConnectionState;

    fn get_priority(&self, device: &PeerAddress) -> Priority;

    fn set_priority(&self, device: &PeerAddress, priority: Priority);

    fn get_devices_matching_connection_states(
        &self,
        states: &[ProfileConnectionState],
    ) -> Vec<PeerAddress>;

    /// Lets a binding channel recognize the handles it issued.
    fn as_any(&self) -> &dyn Any;
}

/// Availability events delivered by a binding channel.
pub enum BindingEvent {
    /// The service handle is now usable.
    Bound(Box<dyn SapService>),
    /// The handle is no longer usable.
    Unbound,
}

impl fmt::Debug for BindingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingEvent::Bound(_) => write!(f, "Bound"),
            BindingEvent::Unbound => write!(f, "Unbound"),
        }
    }
}

pub type BindingEventSender = UnboundedSender<BindingEvent>;
pub type BindingEventReceiver = UnboundedReceiver<BindingEvent>;

/// Source of a transport service handle.
///
/// Events for one channel arrive in order, and `Bound` is never delivered
/// twice without an `Unbound` in between. Delivery happens on the same
/// execution context as the owning controller.
pub trait ServiceBindingChannel {
    /// Starts acquiring the service. Completion arrives later on `events`.
    fn bind(&mut self, events: BindingEventSender) -> Result<(), BindingError>;

    /// Hands a previously delivered handle back to the transport. Handing
    /// back a handle that was already superseded must not affect the
    /// current one.
    fn unbind(&mut self, service: Box<dyn SapService>) -> Result<(), BindingError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound,
}

impl BindingState {
    pub fn next(self, event: &BindingEvent) -> BindingState {
        match event {
            BindingEvent::Bound(_) => BindingState::Bound,
            BindingEvent::Unbound => BindingState::Unbound,
        }
    }
}

//! Presentation hooks: names, summaries and icons shown for a profile.

use serde::{Deserialize, Serialize};

use super::ProfileConnectionState;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameResource {
    SapProfile,
}

impl NameResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameResource::SapProfile => "SIM access",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryResource {
    UseFor,
    Connected,
    Connecting,
    Disconnecting,
}

impl SummaryResource {
    /// Summary for a peer's SAP connection state. In-flight states fall back
    /// to the generic connection-state summaries.
    pub fn for_sap_state(state: ProfileConnectionState) -> Self {
        match state {
            ProfileConnectionState::Disconnected => SummaryResource::UseFor,
            ProfileConnectionState::Connected => SummaryResource::Connected,
            ProfileConnectionState::Connecting => SummaryResource::Connecting,
            ProfileConnectionState::Disconnecting => SummaryResource::Disconnecting,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryResource::UseFor => "Use for SIM access",
            SummaryResource::Connected => "Connected to SIM access",
            SummaryResource::Connecting => "Connecting\u{2026}",
            SummaryResource::Disconnecting => "Disconnecting\u{2026}",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawableResource {
    Cellphone,
}

impl DrawableResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawableResource::Cellphone => "ic_bt_cellphone",
        }
    }
}

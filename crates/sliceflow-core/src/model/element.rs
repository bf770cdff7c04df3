// ── Forwarding elements ──
//
// Connection state of each switch the transport reports. Identity is the
// element id; the name comes from the scenario when declared there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::ids::ElementId;

// ── ConnectionState ──────────────────────────────────────────────────

/// Lifecycle state of a forwarding element's control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Whether commands may be sent to an element in this state.
    ///
    /// `Connecting` counts: the connect handshake itself pushes the
    /// baseline rules and queue-config requests.
    pub fn is_reachable(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

// ── Element ──────────────────────────────────────────────────────────

/// A forwarding element known to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// Topology name from the scenario (`s1`), if the element is declared there.
    pub name: Option<String>,
    pub state: ConnectionState,
    /// How many times the element has completed a connect handshake.
    pub connections: u32,
    pub last_connected: Option<DateTime<Utc>>,
    pub last_disconnected: Option<DateTime<Utc>>,
}

impl Element {
    pub(crate) fn new(id: ElementId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            state: ConnectionState::Disconnected,
            connections: 0,
            last_connected: None,
            last_disconnected: None,
        }
    }

    /// Human-readable label: the topology name when known, else the id.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

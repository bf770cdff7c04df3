// ── Flow rules ──
//
// Transport-neutral description of a match → actions entry installed on
// an element. Framing into a concrete control protocol is the
// transport's job.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::address::{HostAddress, MacAddress};
use super::ids::{PortNo, QueueId};

// ── Priority ────────────────────────────────────────────────────────

/// Flow-table priority. Higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u16);

impl Priority {
    /// Match-all rule sending unmatched traffic to the controller.
    pub const TABLE_MISS: Self = Self(0);
    /// Per-category redirect-to-controller rules (HTTP, DNS, ICMP).
    pub const CATEGORY_REDIRECT: Self = Self(10);
    /// Fast-path rule built from a successful resolution.
    pub const INSTALLED_FLOW: Self = Self(100);

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Baseline tiers are the ones reinstalled on connect and on resync.
    pub fn is_baseline(self) -> bool {
        self < Self::INSTALLED_FLOW
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Match ───────────────────────────────────────────────────────────

/// Match criteria. Every `None` field is a wildcard; the default value
/// matches every packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_port: Option<PortNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_src: Option<MacAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_dst: Option<MacAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_type: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_src: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_dst: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_proto: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_dst: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_dst: Option<u16>,
}

impl FlowMatch {
    /// Wildcard match used by the table-miss rule.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_wildcard(&self) -> bool {
        *self == Self::default()
    }

    /// Pin the source address at whichever layer it belongs to.
    #[must_use]
    pub fn with_source(mut self, addr: &HostAddress) -> Self {
        match addr {
            HostAddress::Link(mac) => self.eth_src = Some(mac.clone()),
            HostAddress::Network(ip) => self.ipv4_src = Some(*ip),
        }
        self
    }

    /// Pin the destination address at whichever layer it belongs to.
    #[must_use]
    pub fn with_destination(mut self, addr: &HostAddress) -> Self {
        match addr {
            HostAddress::Link(mac) => self.eth_dst = Some(mac.clone()),
            HostAddress::Network(ip) => self.ipv4_dst = Some(*ip),
        }
        self
    }
}

// ── Actions ─────────────────────────────────────────────────────────

/// One step of a rule's action list. Order matters: a `SetQueue` applies
/// to the `Output` that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowAction {
    SetQueue { queue: QueueId },
    Output { port: PortNo },
    /// Punt to the controller without buffering on the element.
    Controller,
}

impl FlowAction {
    pub fn output_port(&self) -> Option<PortNo> {
        match self {
            Self::Output { port } => Some(*port),
            _ => None,
        }
    }
}

// ── Rule ────────────────────────────────────────────────────────────

/// A complete flow-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRule {
    pub priority: Priority,
    #[serde(rename = "match")]
    pub flow_match: FlowMatch,
    pub actions: Vec<FlowAction>,
}

impl FlowRule {
    pub fn new(priority: Priority, flow_match: FlowMatch, actions: Vec<FlowAction>) -> Self {
        Self {
            priority,
            flow_match,
            actions,
        }
    }

    /// Egress ports in action order.
    pub fn output_ports(&self) -> Vec<PortNo> {
        self.actions.iter().filter_map(FlowAction::output_port).collect()
    }

    /// Queue tag applied to the output on `port`, if any.
    pub fn queue_for(&self, port: PortNo) -> Option<QueueId> {
        let idx = self
            .actions
            .iter()
            .position(|a| a.output_port() == Some(port))?;
        match idx.checked_sub(1).and_then(|prev| self.actions.get(prev)) {
            Some(FlowAction::SetQueue { queue }) => Some(*queue),
            _ => None,
        }
    }
}

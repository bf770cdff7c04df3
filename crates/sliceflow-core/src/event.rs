// ── Transport events ──
//
// What the southbound transport reports, and what the controller
// concludes from a packet-in.

use bytes::Bytes;
use serde::Serialize;

use crate::model::{
    ElementId, FlowRule, PacketContext, PortNo, QueueId, SliceId, TrafficCategory,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementEvent {
    Connected {
        element: ElementId,
    },
    Disconnected {
        element: ElementId,
    },
    PacketIn {
        element: ElementId,
        in_port: PortNo,
        /// Set when the element kept the packet in its own buffer.
        buffer_id: Option<u32>,
        frame: Bytes,
    },
    QueueConfig {
        element: ElementId,
        port: PortNo,
        queues: Vec<QueueId>,
    },
}

impl ElementEvent {
    pub fn element(&self) -> ElementId {
        match self {
            Self::Connected { element }
            | Self::Disconnected { element }
            | Self::PacketIn { element, .. }
            | Self::QueueConfig { element, .. } => *element,
        }
    }
}

/// The outcome of one packet-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub context: PacketContext,
    pub category: TrafficCategory,
    /// The slice that routed the flow; `None` when nothing matched.
    pub slice: Option<SliceId>,
    pub ports: Vec<PortNo>,
    /// The priority-100 rule, present exactly when `ports` is non-empty.
    pub rule: Option<FlowRule>,
    /// Whether the triggering packet was sent back out.
    pub replayed: bool,
}

impl Decision {
    pub fn is_forwarded(&self) -> bool {
        !self.ports.is_empty()
    }
}

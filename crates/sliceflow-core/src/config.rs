// ── Runtime engine configuration ──
//
// Describes how a `Controller` behaves once the scenario is loaded. Never
// touches disk: the CLI builds an `EngineConfig` from its profile and
// hands it in.

use crate::model::{AddressMode, QueueId, SliceId, TrafficCategory};

/// Queue id each redirected traffic category is steered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePlan {
    pub http: QueueId,
    pub dns: QueueId,
    pub icmp: QueueId,
}

impl QueuePlan {
    /// `None` for `General`: it is never queued.
    pub fn queue_for(&self, category: TrafficCategory) -> Option<QueueId> {
        match category {
            TrafficCategory::Http => Some(self.http),
            TrafficCategory::Dns => Some(self.dns),
            TrafficCategory::Icmp => Some(self.icmp),
            TrafficCategory::General => None,
        }
    }
}

impl Default for QueuePlan {
    fn default() -> Self {
        Self {
            http: QueueId::new(123),
            dns: QueueId::new(234),
            icmp: QueueId::new(345),
        }
    }
}

/// Configuration for a single controller instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Header layer packets are matched on. Must agree with the registry.
    pub address_mode: AddressMode,
    pub queues: QueuePlan,
    /// Slices active from the start, in activation order.
    pub initial_slices: Vec<SliceId>,
    /// Capacity of the command channel feeding the processor task.
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            address_mode: AddressMode::default(),
            queues: QueuePlan::default(),
            initial_slices: Vec::new(),
            command_buffer: 64,
        }
    }
}

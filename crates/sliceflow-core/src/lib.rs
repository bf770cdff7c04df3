// sliceflow-core: slice-aware flow decisions and flow-table synchronization.

pub mod command;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod provision;
pub mod scenario;
pub mod southbound;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{EngineConfig, QueuePlan};
pub use controller::{Controller, ControllerState, ControllerStats};
pub use engine::{FlowDecisionEngine, Resolution, ResyncReport, classify, parse_frame};
pub use error::{CoreError, ScenarioError};
pub use event::{Decision, ElementEvent};
pub use provision::{BandwidthSplit, ProcessProvisioner, QueueProvisioner};
pub use scenario::{ScenarioDoc, ScenarioFormat};
pub use southbound::{ChannelSouthbound, ElementCommand, Outbound, PacketPayload, Southbound};
pub use store::{ActiveSliceSet, ActiveSlices, QueueAvailabilityTracker, SliceRegistry};
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Identity
    ElementId, PortNo, QueueId, SliceId,
    // Addressing
    AddressMode, HostAddress, MacAddress,
    // Elements and packets
    ConnectionState, Element, PacketContext, TrafficCategory, TransportProtocol,
    // Flow rules
    FlowAction, FlowMatch, FlowRule, Priority,
};

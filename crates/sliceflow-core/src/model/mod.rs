// ── Domain model ──
//
// Canonical types shared by the engine, the controller facade and the
// consumers (CLI, transports). Nothing in here performs I/O.

pub mod address;
pub mod element;
pub mod flow;
pub mod ids;
pub mod packet;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use sliceflow_core::model::*` gives you everything.

// Identity
pub use ids::{ElementId, PortNo, QueueId, SliceId};

// Addressing
pub use address::{AddressMode, AddressParseError, HostAddress, MacAddress};

// Elements
pub use element::{ConnectionState, Element};

// Packets
pub use packet::{
    ETH_TYPE_IPV4, IP_PROTO_ICMP, IP_PROTO_TCP, IP_PROTO_UDP, PacketContext, TrafficCategory,
    TransportProtocol,
};

// Flow rules
pub use flow::{FlowAction, FlowMatch, FlowRule, Priority};

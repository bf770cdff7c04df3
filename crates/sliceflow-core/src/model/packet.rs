// ── Packet metadata ──
//
// What the engine knows about one packet-in notification after the
// frame has been parsed. Raw bytes never travel past the parser.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::address::HostAddress;
use super::ids::{ElementId, PortNo};

/// IPv4 ethertype.
pub const ETH_TYPE_IPV4: u16 = 0x0800;

/// IANA protocol numbers used by the classifier.
pub const IP_PROTO_ICMP: u8 = 1;
pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;

/// Transport-layer protocol carried by an IPv4 packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProtocol {
    Tcp,
    Udp,
    Icmp,
    Other(u8),
}

impl TransportProtocol {
    pub fn from_ip_proto(proto: u8) -> Self {
        match proto {
            IP_PROTO_TCP => Self::Tcp,
            IP_PROTO_UDP => Self::Udp,
            IP_PROTO_ICMP => Self::Icmp,
            other => Self::Other(other),
        }
    }

    pub fn ip_proto(self) -> u8 {
        match self {
            Self::Tcp => IP_PROTO_TCP,
            Self::Udp => IP_PROTO_UDP,
            Self::Icmp => IP_PROTO_ICMP,
            Self::Other(proto) => proto,
        }
    }
}

/// Traffic category a packet is steered by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TrafficCategory {
    Http,
    Dns,
    Icmp,
    General,
}

impl TrafficCategory {
    /// Categories that get their own redirect-to-controller baseline rule.
    pub const REDIRECTED: [Self; 3] = [Self::Http, Self::Dns, Self::Icmp];
}

/// Transient view of one packet-in event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketContext {
    pub element: ElementId,
    pub in_port: PortNo,
    pub source: HostAddress,
    pub destination: HostAddress,
    pub protocol: TransportProtocol,
    /// Destination transport port for TCP/UDP, when the header was present.
    pub dst_port: Option<u16>,
}

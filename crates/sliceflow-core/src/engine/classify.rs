// ── Packet classification ──
//
// `parse_frame` turns the raw bytes of a packet-in into a `PacketContext`,
// discarding anything that is not IPv4. `classify` is pure and total over
// whatever survives parsing.

use std::net::Ipv4Addr;

use crate::model::{
    AddressMode, ETH_TYPE_IPV4, ElementId, HostAddress, MacAddress, PacketContext, PortNo,
    TrafficCategory, TransportProtocol,
};

const ETH_HEADER_LEN: usize = 14;
const ETH_TYPE_VLAN: u16 = 0x8100;
const VLAN_TAG_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;

const HTTP_PORT: u16 = 80;
const DNS_PORT: u16 = 53;

/// Map a packet to the category that decides its queue.
pub fn classify(ctx: &PacketContext) -> TrafficCategory {
    match (ctx.protocol, ctx.dst_port) {
        (TransportProtocol::Tcp, Some(HTTP_PORT)) => TrafficCategory::Http,
        (TransportProtocol::Udp, Some(DNS_PORT)) => TrafficCategory::Dns,
        (TransportProtocol::Icmp, _) => TrafficCategory::Icmp,
        _ => TrafficCategory::General,
    }
}

/// Decode an Ethernet II frame carrying IPv4.
///
/// One 802.1Q tag is skipped. Returns `None` for non-IPv4 payloads and
/// truncated headers; such packets produce no decision.
pub fn parse_frame(
    element: ElementId,
    in_port: PortNo,
    frame: &[u8],
    mode: AddressMode,
) -> Option<PacketContext> {
    let eth_dst: [u8; 6] = frame.get(0..6)?.try_into().ok()?;
    let eth_src: [u8; 6] = frame.get(6..12)?.try_into().ok()?;

    let mut offset = ETH_HEADER_LEN;
    let mut eth_type = read_u16(frame, 12)?;
    if eth_type == ETH_TYPE_VLAN {
        eth_type = read_u16(frame, 16)?;
        offset += VLAN_TAG_LEN;
    }
    if eth_type != ETH_TYPE_IPV4 {
        return None;
    }

    let ip = frame.get(offset..)?;
    let version_ihl = *ip.first()?;
    if version_ihl >> 4 != 4 {
        return None;
    }
    let ihl = usize::from(version_ihl & 0x0f) * 4;
    if ihl < IPV4_MIN_HEADER_LEN || ip.len() < ihl {
        return None;
    }

    let protocol = TransportProtocol::from_ip_proto(*ip.get(9)?);
    let ip_src = read_ipv4(ip, 12)?;
    let ip_dst = read_ipv4(ip, 16)?;

    // Destination port sits at offset 2 of both TCP and UDP headers.
    let dst_port = match protocol {
        TransportProtocol::Tcp | TransportProtocol::Udp => read_u16(ip, ihl + 2),
        _ => None,
    };

    let (source, destination) = match mode {
        AddressMode::Link => (
            HostAddress::Link(MacAddress::from_octets(eth_src)),
            HostAddress::Link(MacAddress::from_octets(eth_dst)),
        ),
        AddressMode::Network => (HostAddress::Network(ip_src), HostAddress::Network(ip_dst)),
    };

    Some(PacketContext {
        element,
        in_port,
        source,
        destination,
        protocol,
        dst_port,
    })
}

fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes: [u8; 2] = buf.get(at..at + 2)?.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
}

fn read_ipv4(buf: &[u8], at: usize) -> Option<Ipv4Addr> {
    let bytes: [u8; 4] = buf.get(at..at + 4)?.try_into().ok()?;
    Some(Ipv4Addr::from(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{IP_PROTO_ICMP, IP_PROTO_TCP, IP_PROTO_UDP};

    /// Minimal Ethernet + IPv4 (+ 4 transport bytes) frame between hosts
    /// `00:..:0s` / `10.0.0.s` and `00:..:0d` / `10.0.0.d`.
    pub(crate) fn frame(src: u8, dst: u8, proto: u8, dst_port: u16) -> Vec<u8> {
        let mut f = Vec::new();
        f.extend_from_slice(&[0, 0, 0, 0, 0, dst]);
        f.extend_from_slice(&[0, 0, 0, 0, 0, src]);
        f.extend_from_slice(&ETH_TYPE_IPV4.to_be_bytes());
        let mut ip = [0u8; 20];
        ip[0] = 0x45;
        ip[9] = proto;
        ip[12..16].copy_from_slice(&[10, 0, 0, src]);
        ip[16..20].copy_from_slice(&[10, 0, 0, dst]);
        f.extend_from_slice(&ip);
        f.extend_from_slice(&40000u16.to_be_bytes());
        f.extend_from_slice(&dst_port.to_be_bytes());
        f
    }

    fn ctx(proto: u8, port: u16) -> PacketContext {
        parse_frame(
            ElementId::new(1),
            PortNo::new(1),
            &frame(1, 2, proto, port),
            AddressMode::Link,
        )
        .unwrap()
    }

    #[test]
    fn classifies_by_protocol_and_port() {
        assert_eq!(classify(&ctx(IP_PROTO_TCP, 80)), TrafficCategory::Http);
        assert_eq!(classify(&ctx(IP_PROTO_UDP, 53)), TrafficCategory::Dns);
        assert_eq!(classify(&ctx(IP_PROTO_ICMP, 0)), TrafficCategory::Icmp);
        assert_eq!(classify(&ctx(IP_PROTO_TCP, 443)), TrafficCategory::General);
        // Port 53 over TCP and port 80 over UDP are not special.
        assert_eq!(classify(&ctx(IP_PROTO_TCP, 53)), TrafficCategory::General);
        assert_eq!(classify(&ctx(IP_PROTO_UDP, 80)), TrafficCategory::General);
        assert_eq!(classify(&ctx(47, 80)), TrafficCategory::General);
    }

    #[test]
    fn link_mode_reads_macs() {
        let c = ctx(IP_PROTO_TCP, 80);
        assert_eq!(c.source, "00:00:00:00:00:01".parse().unwrap());
        assert_eq!(c.destination, "00:00:00:00:00:02".parse().unwrap());
        assert_eq!(c.dst_port, Some(80));
    }

    #[test]
    fn network_mode_reads_ipv4() {
        let c = parse_frame(
            ElementId::new(1),
            PortNo::new(2),
            &frame(3, 7, IP_PROTO_UDP, 53),
            AddressMode::Network,
        )
        .unwrap();
        assert_eq!(c.source, HostAddress::Network(Ipv4Addr::new(10, 0, 0, 3)));
        assert_eq!(c.destination, HostAddress::Network(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(c.in_port, PortNo::new(2));
    }

    #[test]
    fn skips_one_vlan_tag() {
        let plain = frame(1, 2, IP_PROTO_TCP, 80);
        let mut tagged = plain[..12].to_vec();
        tagged.extend_from_slice(&ETH_TYPE_VLAN.to_be_bytes());
        tagged.extend_from_slice(&[0x00, 0x0a]);
        tagged.extend_from_slice(&plain[12..]);

        let c = parse_frame(ElementId::new(1), PortNo::new(1), &tagged, AddressMode::Link).unwrap();
        assert_eq!(classify(&c), TrafficCategory::Http);
    }

    #[test]
    fn discards_non_ipv4_and_truncated_frames() {
        let mut arp = frame(1, 2, IP_PROTO_TCP, 80);
        arp[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        assert!(parse_frame(ElementId::new(1), PortNo::new(1), &arp, AddressMode::Link).is_none());

        let short = &frame(1, 2, IP_PROTO_TCP, 80)[..20];
        assert!(parse_frame(ElementId::new(1), PortNo::new(1), short, AddressMode::Link).is_none());
        assert!(parse_frame(ElementId::new(1), PortNo::new(1), &[], AddressMode::Link).is_none());
    }

    #[test]
    fn tcp_without_transport_header_has_no_port() {
        let f = frame(1, 2, IP_PROTO_TCP, 80);
        let c = parse_frame(ElementId::new(1), PortNo::new(1), &f[..34], AddressMode::Link).unwrap();
        assert_eq!(c.dst_port, None);
        assert_eq!(classify(&c), TrafficCategory::General);
    }
}

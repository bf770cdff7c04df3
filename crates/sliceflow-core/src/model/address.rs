// ── Host addressing ──
//
// Slices are keyed by host address. Depending on the deployment that is
// either the link-layer MAC or the network-layer IPv4 address; the
// `AddressMode` picked at load time decides which one every lookup uses.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Raised when a textual address cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address '{input}': expected a MAC (aa:bb:cc:dd:ee:ff) or IPv4 address")]
pub struct AddressParseError {
    pub input: String,
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Build from the six raw octets of an Ethernet header.
    pub fn from_octets(octets: [u8; 6]) -> Self {
        let [a, b, c, d, e, f] = octets;
        Self(format!("{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{f:02x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts colon-separated, dash-separated, or bare hex (12 digits).
impl FromStr for MacAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError { input: s.into() };
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(err)?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| err())?;
        }
        Ok(Self::from_octets(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

// ── AddressMode ─────────────────────────────────────────────────────

/// Which header layer supplies the addresses slices are keyed on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AddressMode {
    /// Ethernet source/destination (MAC).
    #[default]
    Link,
    /// IPv4 source/destination.
    Network,
}

// ── HostAddress ─────────────────────────────────────────────────────

/// A host address at either layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostAddress {
    Network(Ipv4Addr),
    Link(MacAddress),
}

impl HostAddress {
    pub fn mode(&self) -> AddressMode {
        match self {
            Self::Link(_) => AddressMode::Link,
            Self::Network(_) => AddressMode::Network,
        }
    }

    pub fn as_mac(&self) -> Option<&MacAddress> {
        match self {
            Self::Link(mac) => Some(mac),
            Self::Network(_) => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Network(ip) => Some(*ip),
            Self::Link(_) => None,
        }
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(mac) => write!(f, "{mac}"),
            Self::Network(ip) => write!(f, "{ip}"),
        }
    }
}

impl FromStr for HostAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = s.trim().parse::<Ipv4Addr>() {
            return Ok(Self::Network(ip));
        }
        s.parse::<MacAddress>().map(Self::Link)
    }
}

impl From<MacAddress> for HostAddress {
    fn from(mac: MacAddress) -> Self {
        Self::Link(mac)
    }
}

impl From<Ipv4Addr> for HostAddress {
    fn from(ip: Ipv4Addr) -> Self {
        Self::Network(ip)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mac_address_normalizes_dashes() {
        let mac: MacAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_address_accepts_bare_hex() {
        let mac: MacAddress = "00000000000a".parse().unwrap();
        assert_eq!(mac.to_string(), "00:00:00:00:00:0a");
    }

    #[test]
    fn mac_address_rejects_short_input() {
        assert!("aa:bb:cc".parse::<MacAddress>().is_err());
        assert!("zz:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
    }

    #[test]
    fn mac_from_octets_matches_parse() {
        let mac = MacAddress::from_octets([0, 0, 0, 0, 0, 0x0a]);
        assert_eq!(mac, "00:00:00:00:00:0A".parse().unwrap());
    }

    #[test]
    fn host_address_prefers_ipv4() {
        let addr: HostAddress = "10.0.0.3".parse().unwrap();
        assert_eq!(addr.mode(), AddressMode::Network);
        let addr: HostAddress = "00:00:00:00:00:03".parse().unwrap();
        assert_eq!(addr.mode(), AddressMode::Link);
    }

    #[test]
    fn address_mode_parses_case_insensitively() {
        assert_eq!("Network".parse::<AddressMode>().unwrap(), AddressMode::Network);
        assert_eq!(AddressMode::Link.to_string(), "link");
    }
}

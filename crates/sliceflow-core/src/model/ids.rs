// ── Core identity types ──
//
// ElementId, PortNo, QueueId and SliceId form the foundation of every
// domain type. Numeric ids come straight from the forwarding elements;
// slice ids are the operator-facing names from the scenario file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ── ElementId ───────────────────────────────────────────────────────

/// Stable numeric identifier of a forwarding element (datapath id).
///
/// Survives reconnections: an element that drops and comes back is the
/// same `ElementId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts decimal (`4`) or hex with a `0x` prefix (`0x0000000000000004`).
impl FromStr for ElementId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).map(Self),
            None => s.parse().map(Self),
        }
    }
}

impl From<u64> for ElementId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

// ── PortNo ──────────────────────────────────────────────────────────

/// Physical port number on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNo(u32);

impl PortNo {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortNo {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for PortNo {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ── QueueId ─────────────────────────────────────────────────────────

/// Identifier of a rate-limited egress queue on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(u32);

impl QueueId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for QueueId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ── SliceId ─────────────────────────────────────────────────────────

/// Name of a traffic slice as declared in the scenario.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(String);

impl SliceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SliceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl From<&str> for SliceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SliceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn element_id_parses_decimal() {
        let id: ElementId = "4".parse().unwrap();
        assert_eq!(id.get(), 4);
    }

    #[test]
    fn element_id_parses_hex_dpid() {
        let id: ElementId = "0x000000000000000a".parse().unwrap();
        assert_eq!(id, ElementId::new(10));
    }

    #[test]
    fn element_id_rejects_garbage() {
        assert!("s1".parse::<ElementId>().is_err());
    }

    #[test]
    fn slice_id_trims_whitespace() {
        let id: SliceId = "  first ".parse().unwrap();
        assert_eq!(id.as_str(), "first");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&(ElementId::new(3), PortNo::new(2))).unwrap();
        assert_eq!(json, "[3,2]");
    }
}

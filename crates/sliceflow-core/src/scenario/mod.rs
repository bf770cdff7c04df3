// ── Scenario definitions ──
//
// The on-disk description of a deployment: hosts, elements with their
// declared links, and the slices defined over them. Documents are
// versioned and may be TOML, JSON or YAML. Nothing here is trusted until
// `SliceRegistry::from_scenario` has validated it.

mod validate;

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::model::{ElementId, MacAddress, PortNo};

pub(crate) use validate::build_registry;

/// The only document version this build understands.
pub const SCENARIO_VERSION: u32 = 1;

/// Top-level scenario document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDoc {
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hosts: Vec<HostDef>,
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub slices: Vec<SliceDef>,
}

/// An end host attached to some element port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostDef {
    pub name: String,
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
}

/// A forwarding element and its declared links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementDef {
    pub id: ElementId,
    pub name: String,
    #[serde(default)]
    pub links: Vec<LinkDef>,
}

/// `port` on the owning element is wired to `peer` (a host or element name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkDef {
    pub port: PortNo,
    pub peer: String,
}

/// A named slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

/// Routes for traffic from `source` as seen by `element`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    pub element: String,
    pub source: String,
    #[serde(default)]
    pub routes: Vec<RouteDef>,
}

/// Where traffic for `destination` leaves the element.
///
/// `via` names link peers and is resolved through the topology; `ports`
/// names port numbers directly. Both may be given; via-ports come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDef {
    pub destination: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortNo>,
}

/// Serialization formats a scenario may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioFormat {
    Toml,
    Json,
    Yaml,
}

impl ScenarioFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

impl ScenarioDoc {
    /// Decode a document from text. Checks the version, nothing else.
    pub fn parse(text: &str, format: ScenarioFormat, path: &Path) -> Result<Self, ScenarioError> {
        let parse_err = |message: String| ScenarioError::Parse {
            path: path.to_path_buf(),
            format: format.name(),
            message,
        };

        let doc: Self = match format {
            ScenarioFormat::Toml => toml::from_str(text).map_err(|e| parse_err(e.to_string()))?,
            ScenarioFormat::Json => {
                serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?
            }
            ScenarioFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string()))?
            }
        };

        if doc.version != SCENARIO_VERSION {
            return Err(ScenarioError::UnsupportedVersion {
                found: doc.version,
                supported: SCENARIO_VERSION,
            });
        }
        Ok(doc)
    }

    /// Read and decode a scenario file, picking the format by extension.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let format =
            ScenarioFormat::from_path(path).ok_or_else(|| ScenarioError::UnsupportedFormat {
                path: path.to_path_buf(),
            })?;
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, format, path)
    }
}

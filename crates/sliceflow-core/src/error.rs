// ── Core error types ──
//
// User-facing errors from sliceflow-core. Scenario problems get their own
// enum because they are all raised before the engine accepts a single
// event; everything at runtime funnels into `CoreError`.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{ElementId, PortNo};

/// Problems found while loading or validating a scenario definition.
#[derive(Debug, Error)]
pub enum ScenarioError {
    // ── Reading / decoding ───────────────────────────────────────────
    #[error("Cannot read scenario {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {format} scenario {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Unsupported scenario file extension: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Unsupported scenario version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    // ── Topology ─────────────────────────────────────────────────────
    #[error("Host '{name}' is declared more than once")]
    DuplicateHost { name: String },

    #[error("Address {address} is used by both '{first}' and '{second}'")]
    DuplicateAddress {
        address: String,
        first: String,
        second: String,
    },

    #[error("Element '{name}' is declared more than once")]
    DuplicateElement { name: String },

    #[error("Element id {id} is used by more than one element")]
    DuplicateElementId { id: ElementId },

    #[error("Element '{element}' declares port {port} more than once")]
    DuplicatePort { element: String, port: PortNo },

    #[error("Element '{element}' port {port} links to unknown peer '{peer}'")]
    UnknownPeer {
        element: String,
        port: PortNo,
        peer: String,
    },

    #[error("Element '{element}' port {port} links to '{peer}', which has no link back")]
    OneSidedLink {
        element: String,
        port: PortNo,
        peer: String,
    },

    // ── Slices ───────────────────────────────────────────────────────
    #[error("Slice '{name}' is declared more than once")]
    DuplicateSlice { name: String },

    #[error("Slice '{slice}' references unknown element '{element}'")]
    UnknownElement { slice: String, element: String },

    #[error("Slice '{slice}' on element '{element}' references unknown host '{host}'")]
    UnknownHost {
        slice: String,
        element: String,
        host: String,
    },

    #[error("Slice '{slice}': element '{element}' has no link to '{peer}'")]
    PeerNotLinked {
        slice: String,
        element: String,
        peer: String,
    },

    #[error("Slice '{slice}': element '{element}' has no declared port {port}")]
    UndeclaredPort {
        slice: String,
        element: String,
        port: PortNo,
    },

    #[error("Slice '{slice}': route {source_host} -> {destination} on '{element}' has no egress port")]
    EmptyRoute {
        slice: String,
        element: String,
        source_host: String,
        destination: String,
    },

    #[error("Slice '{slice}': source '{source_host}' has more than one rule on element '{element}'")]
    DuplicateSource {
        slice: String,
        element: String,
        source_host: String,
    },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Load-time errors ─────────────────────────────────────────────
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Slice not found: {name}")]
    SliceNotFound { name: String },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Invalid bandwidth split: {reason}")]
    InvalidBandwidthSplit { reason: String },

    // ── Provisioning errors ──────────────────────────────────────────
    #[error("Queue provisioner is already running")]
    ProvisionerBusy,

    #[error("Queue provisioning failed: {message}")]
    ProvisioningFailed { message: String },

    // ── Runtime errors ───────────────────────────────────────────────
    #[error("Southbound transport is closed")]
    TransportClosed,

    #[error("Controller is not running")]
    ControllerStopped,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Southbound commands ──
//
// What the controller asks of an element, and the seam to whatever
// transport carries it. The wire protocol is the transport's business;
// the core only needs "send this to element X".

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{ElementId, FlowAction, FlowRule, PortNo};
use crate::store::ElementRegistry;

/// The packet a replay refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketPayload {
    /// Still held by the element under this buffer id.
    Buffered(u32),
    /// Not buffered; the full frame is sent back.
    Raw(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementCommand {
    InstallRule(FlowRule),
    DeleteAllRules,
    ReplayPacket {
        in_port: PortNo,
        payload: PacketPayload,
        actions: Vec<FlowAction>,
    },
    RequestQueueConfig {
        port: PortNo,
    },
}

impl ElementCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InstallRule(_) => "install_rule",
            Self::DeleteAllRules => "delete_all_rules",
            Self::ReplayPacket { .. } => "replay_packet",
            Self::RequestQueueConfig { .. } => "request_queue_config",
        }
    }
}

/// Transport capability: deliver one command to one element.
///
/// Must not block; a transport that cannot deliver returns an error.
pub trait Southbound: Send + Sync {
    fn send(&self, element: ElementId, command: ElementCommand) -> Result<(), CoreError>;
}

/// A command addressed to an element, as queued by `ChannelSouthbound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub element: ElementId,
    pub command: ElementCommand,
}

/// Southbound that queues every command on an unbounded channel for a
/// transport task (or a test) to drain.
#[derive(Clone)]
pub struct ChannelSouthbound {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelSouthbound {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Southbound for ChannelSouthbound {
    fn send(&self, element: ElementId, command: ElementCommand) -> Result<(), CoreError> {
        self.tx
            .send(Outbound { element, command })
            .map_err(|_| CoreError::TransportClosed)
    }
}

/// Reachability-guarded sender. Commands for elements that are not
/// connecting or connected are dropped.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    southbound: Arc<dyn Southbound>,
    elements: Arc<ElementRegistry>,
}

impl Dispatcher {
    pub(crate) fn new(southbound: Arc<dyn Southbound>, elements: Arc<ElementRegistry>) -> Self {
        Self {
            southbound,
            elements,
        }
    }

    /// `Ok(false)` when the element was unreachable and nothing was sent.
    pub(crate) fn send(
        &self,
        element: ElementId,
        command: ElementCommand,
    ) -> Result<bool, CoreError> {
        if !self.elements.is_reachable(element) {
            info!(%element, command = command.kind(), "element unreachable, command skipped");
            return Ok(false);
        }
        debug!(%element, command = command.kind(), "sending command");
        self.southbound.send(element, command)?;
        Ok(true)
    }
}

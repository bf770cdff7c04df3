// ── Command API ──
//
// Operations that change the active configuration flow through one
// `Command` enum and are applied one at a time by the controller's
// command processor, so their resync passes never interleave.

use std::sync::Arc;

use crate::engine::ResyncReport;
use crate::error::CoreError;
use crate::model::SliceId;
use crate::store::ActiveSlices;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Flip a slice in or out of the active set, then resync.
    ToggleSlice { slice: SliceId },
    /// Resync every connected element without changing the active set.
    Resync,
}

#[derive(Debug, Clone)]
pub enum CommandResult {
    Toggled {
        active: Arc<ActiveSlices>,
        report: ResyncReport,
    },
    Resynced(ResyncReport),
}

impl CommandResult {
    pub fn report(&self) -> &ResyncReport {
        match self {
            Self::Toggled { report, .. } | Self::Resynced(report) => report,
        }
    }
}

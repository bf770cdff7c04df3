// ── Flow table synchronization ──
//
// After every change of the active set, each connected element has its
// flow table wiped and the baseline reinstalled, so learned priority-100
// rules never outlive the configuration they were computed under.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::rules;
use crate::error::CoreError;
use crate::model::ElementId;
use crate::southbound::{Dispatcher, ElementCommand};
use crate::store::ElementRegistry;

/// Outcome of one resync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    /// Elements that were `Connected` when the pass started.
    pub targeted: Vec<ElementId>,
    /// Wiped and re-baselined.
    pub completed: Vec<ElementId>,
    /// Went away mid-pass; left to their own reconnect.
    pub skipped: Vec<ElementId>,
    /// Transport errors, per element.
    pub failed: Vec<(ElementId, String)>,
    pub finished_at: DateTime<Utc>,
}

pub(crate) struct FlowTableSynchronizer {
    dispatcher: Dispatcher,
    elements: Arc<ElementRegistry>,
}

impl FlowTableSynchronizer {
    pub(crate) fn new(dispatcher: Dispatcher, elements: Arc<ElementRegistry>) -> Self {
        Self {
            dispatcher,
            elements,
        }
    }

    /// Priority 0 then priority 10, in that order.
    ///
    /// Stops at the first skipped send: the element's next connect
    /// installs the whole baseline again.
    pub(crate) fn install_baseline(&self, element: ElementId) -> Result<bool, CoreError> {
        for rule in rules::baseline_rules() {
            if !self
                .dispatcher
                .send(element, ElementCommand::InstallRule(rule))?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Wipe every connected element, then reinstall each one's baseline.
    ///
    /// Elements are independent: a failure on one is logged and the pass
    /// moves on.
    pub(crate) fn resync(&self) -> ResyncReport {
        let targeted = self.elements.connected();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        let mut wiped = Vec::with_capacity(targeted.len());
        for &element in &targeted {
            match self.dispatcher.send(element, ElementCommand::DeleteAllRules) {
                Ok(true) => wiped.push(element),
                Ok(false) => skipped.push(element),
                Err(e) => {
                    warn!(%element, error = %e, "delete-all failed during resync");
                    failed.push((element, e.to_string()));
                }
            }
        }

        let mut completed = Vec::with_capacity(wiped.len());
        for element in wiped {
            match self.install_baseline(element) {
                Ok(true) => completed.push(element),
                Ok(false) => skipped.push(element),
                Err(e) => {
                    warn!(%element, error = %e, "baseline install failed during resync");
                    failed.push((element, e.to_string()));
                }
            }
        }

        info!(
            targeted = targeted.len(),
            completed = completed.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            "flow tables resynchronized"
        );

        ResyncReport {
            targeted,
            completed,
            skipped,
            failed,
            finished_at: Utc::now(),
        }
    }
}

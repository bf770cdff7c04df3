// ── Queue availability ──
//
// What each element has reported about the queues on its ports. Purely
// advisory: an unknown (element, port) means "no queues", never an error.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::model::{ElementId, PortNo, QueueId};

#[derive(Default)]
pub struct QueueAvailabilityTracker {
    ports: DashMap<(ElementId, PortNo), Arc<BTreeSet<QueueId>>>,
}

impl QueueAvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known set for `element`/`port`. The latest report wins.
    pub fn record_queues(
        &self,
        element: ElementId,
        port: PortNo,
        queues: impl IntoIterator<Item = QueueId>,
    ) {
        let set: BTreeSet<QueueId> = queues.into_iter().collect();
        self.ports.insert((element, port), Arc::new(set));
    }

    pub fn has_queue(&self, element: ElementId, port: PortNo, queue: QueueId) -> bool {
        self.ports
            .get(&(element, port))
            .is_some_and(|set| set.contains(&queue))
    }

    /// Queues last reported for `element`/`port`, empty if none.
    pub fn queues(&self, element: ElementId, port: PortNo) -> Arc<BTreeSet<QueueId>> {
        self.ports
            .get(&(element, port))
            .map(|set| Arc::clone(set.value()))
            .unwrap_or_default()
    }

    /// Drop everything known about `element`. Reports are re-requested on
    /// the next connect.
    pub fn forget_element(&self, element: ElementId) {
        self.ports.retain(|(id, _), _| *id != element);
    }

    /// Number of (element, port) pairs with a report on file.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E1: ElementId = ElementId::new(1);
    const E2: ElementId = ElementId::new(2);

    #[test]
    fn unknown_port_has_no_queues() {
        let tracker = QueueAvailabilityTracker::new();
        assert!(!tracker.has_queue(E1, PortNo::new(1), QueueId::new(123)));
        assert!(tracker.queues(E1, PortNo::new(1)).is_empty());
    }

    #[test]
    fn latest_report_replaces_previous() {
        let tracker = QueueAvailabilityTracker::new();
        tracker.record_queues(E1, PortNo::new(3), [QueueId::new(123), QueueId::new(234)]);
        tracker.record_queues(E1, PortNo::new(3), [QueueId::new(345)]);

        assert!(!tracker.has_queue(E1, PortNo::new(3), QueueId::new(123)));
        assert!(tracker.has_queue(E1, PortNo::new(3), QueueId::new(345)));
    }

    #[test]
    fn reports_are_scoped_per_element_and_port() {
        let tracker = QueueAvailabilityTracker::new();
        tracker.record_queues(E1, PortNo::new(1), [QueueId::new(123)]);

        assert!(!tracker.has_queue(E1, PortNo::new(2), QueueId::new(123)));
        assert!(!tracker.has_queue(E2, PortNo::new(1), QueueId::new(123)));
    }

    #[test]
    fn forget_element_clears_only_that_element() {
        let tracker = QueueAvailabilityTracker::new();
        tracker.record_queues(E1, PortNo::new(1), [QueueId::new(123)]);
        tracker.record_queues(E1, PortNo::new(2), [QueueId::new(123)]);
        tracker.record_queues(E2, PortNo::new(1), [QueueId::new(123)]);

        tracker.forget_element(E1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.has_queue(E2, PortNo::new(1), QueueId::new(123)));
    }
}

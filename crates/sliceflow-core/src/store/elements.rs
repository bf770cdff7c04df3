// ── Element registry ──
//
// Connection lifecycle of every element the transport has reported.
// Identity survives reconnects; only the state moves. Every mutation
// rebuilds the snapshot that `watch` subscribers receive.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{ConnectionState, Element, ElementId};

pub struct ElementRegistry {
    by_id: DashMap<ElementId, Arc<Element>>,

    /// All known elements ordered by id, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<Element>>>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            snapshot,
        }
    }

    /// Disconnected → Connecting. Creates the element on first sight.
    pub fn begin_connect(&self, id: ElementId, name: Option<String>) -> Arc<Element> {
        let element = {
            let mut entry = self
                .by_id
                .entry(id)
                .or_insert_with(|| Arc::new(Element::new(id, name.clone())));
            let mut next = Element::clone(entry.value());
            next.state = ConnectionState::Connecting;
            if next.name.is_none() {
                next.name = name;
            }
            let next = Arc::new(next);
            *entry.value_mut() = Arc::clone(&next);
            next
        };
        self.rebuild_snapshot();
        element
    }

    /// Connecting → Connected.
    ///
    /// Returns `None` if the element dropped while the handshake was in
    /// flight; a late completion never resurrects it.
    pub fn mark_connected(&self, id: ElementId) -> Option<Arc<Element>> {
        let element = self.transition(id, |el| {
            (el.state == ConnectionState::Connecting).then(|| {
                let mut next = el.clone();
                next.state = ConnectionState::Connected;
                next.connections += 1;
                next.last_connected = Some(Utc::now());
                next
            })
        })?;
        self.rebuild_snapshot();
        Some(element)
    }

    /// Any reachable state → Disconnected. `None` if unknown or already down.
    pub fn disconnect(&self, id: ElementId) -> Option<Arc<Element>> {
        let element = self.transition(id, |el| {
            el.state.is_reachable().then(|| {
                let mut next = el.clone();
                next.state = ConnectionState::Disconnected;
                next.last_disconnected = Some(Utc::now());
                next
            })
        })?;
        self.rebuild_snapshot();
        Some(element)
    }

    pub fn get(&self, id: ElementId) -> Option<Arc<Element>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Unknown elements are `Disconnected`.
    pub fn state(&self, id: ElementId) -> ConnectionState {
        self.by_id
            .get(&id)
            .map_or(ConnectionState::Disconnected, |r| r.state)
    }

    pub fn is_reachable(&self, id: ElementId) -> bool {
        self.state(id).is_reachable()
    }

    /// Ids of every `Connected` element, ascending.
    pub fn connected(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self
            .by_id
            .iter()
            .filter(|r| r.state == ConnectionState::Connected)
            .map(|r| *r.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Element>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Element>>>> {
        self.snapshot.subscribe()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Apply `f` under the entry lock; `None` from `f` leaves it untouched.
    fn transition(
        &self,
        id: ElementId,
        f: impl FnOnce(&Element) -> Option<Element>,
    ) -> Option<Arc<Element>> {
        let mut entry = self.by_id.get_mut(&id)?;
        let next = Arc::new(f(entry.value())?);
        *entry.value_mut() = Arc::clone(&next);
        Some(next)
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<Element>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_unstable_by_key(|e| e.id);
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Active slice set ──
//
// Ordered set of enabled slices. Readers take a lock-free snapshot via
// `ArcSwap`; writers are serialized through the `watch` sender, which also
// fans the new snapshot out to subscribers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::watch;

use crate::model::SliceId;

/// Immutable snapshot of the active set, oldest activation first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActiveSlices(Vec<SliceId>);

impl ActiveSlices {
    pub fn new(ids: impl IntoIterator<Item = SliceId>) -> Self {
        let mut out: Vec<SliceId> = Vec::new();
        for id in ids {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self(out)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SliceId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[SliceId] {
        &self.0
    }

    pub fn contains(&self, id: &SliceId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slice names in activation order.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|id| id.as_str().to_owned()).collect()
    }

    /// Remove `id` if present, otherwise append it.
    #[must_use]
    pub fn toggled(&self, id: &SliceId) -> Self {
        let mut next = self.0.clone();
        if let Some(pos) = next.iter().position(|s| s == id) {
            next.remove(pos);
        } else {
            next.push(id.clone());
        }
        Self(next)
    }
}

impl<'a> IntoIterator for &'a ActiveSlices {
    type Item = &'a SliceId;
    type IntoIter = std::slice::Iter<'a, SliceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The mutable owner of the active set. One per controller instance.
pub struct ActiveSliceSet {
    current: ArcSwap<ActiveSlices>,
    changes: watch::Sender<Arc<ActiveSlices>>,
}

impl ActiveSliceSet {
    pub fn new(initial: ActiveSlices) -> Self {
        let initial = Arc::new(initial);
        let (changes, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: ArcSwap::new(initial),
            changes,
        }
    }

    /// The set as of now. Never observes a half-applied toggle.
    pub fn snapshot(&self) -> Arc<ActiveSlices> {
        self.current.load_full()
    }

    /// Flip membership of `id` and publish the result.
    ///
    /// Membership is not checked against any registry; callers validate.
    pub fn toggle(&self, id: &SliceId) -> Arc<ActiveSlices> {
        let mut published = Arc::default();
        // `send_modify` holds the channel's write lock, so concurrent
        // toggles apply one after another.
        self.changes.send_modify(|snap| {
            let next = Arc::new(snap.toggled(id));
            self.current.store(Arc::clone(&next));
            *snap = Arc::clone(&next);
            published = next;
        });
        published
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ActiveSlices>> {
        self.changes.subscribe()
    }
}

impl Default for ActiveSliceSet {
    fn default() -> Self {
        Self::new(ActiveSlices::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<SliceId> {
        names.iter().map(|n| SliceId::from(*n)).collect()
    }

    #[test]
    fn toggle_appends_then_removes() {
        let set = ActiveSliceSet::default();
        set.toggle(&"a".into());
        set.toggle(&"b".into());
        assert_eq!(set.snapshot().as_slice(), ids(&["a", "b"]).as_slice());

        set.toggle(&"a".into());
        assert_eq!(set.snapshot().names(), vec!["b"]);
    }

    #[test]
    fn double_toggle_restores_prior_set() {
        let set = ActiveSliceSet::new(ActiveSlices::new(ids(&["x", "y"])));
        let before = set.snapshot();

        set.toggle(&"w".into());
        set.toggle(&"w".into());
        assert_eq!(*before, *set.snapshot());

        set.toggle(&"y".into());
        set.toggle(&"y".into());
        assert_eq!(*before, *set.snapshot());
    }

    #[test]
    fn retoggling_moves_slice_to_the_back() {
        let set = ActiveSliceSet::new(ActiveSlices::new(ids(&["x", "y", "z"])));
        set.toggle(&"x".into());
        set.toggle(&"x".into());
        assert_eq!(set.snapshot().names(), vec!["y", "z", "x"]);
    }

    #[test]
    fn new_drops_duplicates_keeping_first() {
        let snap = ActiveSlices::new(ids(&["a", "b", "a"]));
        assert_eq!(snap.names(), vec!["a", "b"]);
    }

    #[test]
    fn old_snapshot_is_unaffected_by_toggle() {
        let set = ActiveSliceSet::new(ActiveSlices::new(ids(&["a"])));
        let held = set.snapshot();
        set.toggle(&"b".into());
        assert_eq!(held.names(), vec!["a"]);
        assert_eq!(set.snapshot().names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn subscribers_see_each_toggle() {
        let set = ActiveSliceSet::default();
        let mut rx = set.subscribe();
        set.toggle(&"a".into());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().names(), vec!["a"]);
    }
}

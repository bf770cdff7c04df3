// ── Engine state ──
//
// The registry is read-only after load. The active set, the queue
// tracker and the element registry are the only shared mutable state;
// each owns its own synchronization.

mod active;
mod elements;
mod queues;
mod slice_registry;

pub use active::{ActiveSliceSet, ActiveSlices};
pub use elements::ElementRegistry;
pub use queues::QueueAvailabilityTracker;
pub use slice_registry::{RouteEntry, SliceRegistry, SliceTable, Topology, TopologyElement};

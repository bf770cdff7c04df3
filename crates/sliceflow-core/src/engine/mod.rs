// ── Decision engine ──
//
// Classification, resolution, rule construction and flow-table
// resynchronization. Pure computation except for `sync`, which talks to
// elements through the dispatcher.

pub mod classify;
pub mod resolve;
pub mod rules;
pub(crate) mod sync;

pub use classify::{classify, parse_frame};
pub use resolve::{FlowDecisionEngine, Resolution};
pub use rules::{baseline_rules, build_flow_rule, category_match, table_miss_rule};
pub use sync::ResyncReport;

// ── Flow decisions ──
//
// Resolution walks the active slices oldest-first; the first slice with an
// entry for the destination decides the egress ports. Slices are never
// merged. Every decision reads one `ActiveSlices` snapshot.

use std::sync::Arc;

use tracing::debug;

use super::{classify, rules};
use crate::config::QueuePlan;
use crate::event::Decision;
use crate::model::{ElementId, HostAddress, PacketContext, PortNo, SliceId};
use crate::store::{ActiveSlices, QueueAvailabilityTracker, SliceRegistry};

/// Which slice matched and the ports it routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub slice: SliceId,
    pub ports: Vec<PortNo>,
}

pub struct FlowDecisionEngine {
    registry: Arc<SliceRegistry>,
    queues: QueuePlan,
}

impl FlowDecisionEngine {
    pub fn new(registry: Arc<SliceRegistry>, queues: QueuePlan) -> Self {
        Self { registry, queues }
    }

    pub fn registry(&self) -> &Arc<SliceRegistry> {
        &self.registry
    }

    pub fn queues(&self) -> &QueuePlan {
        &self.queues
    }

    /// First active slice (by activation order) with a route for
    /// `destination`, and that route's ports.
    pub fn lookup(
        &self,
        element: ElementId,
        source: &HostAddress,
        destination: &HostAddress,
        active: &ActiveSlices,
    ) -> Option<Resolution> {
        active.iter().find_map(|slice| {
            self.registry
                .entries_for(element, slice, source)
                .iter()
                .find(|entry| entry.destination == *destination)
                .map(|entry| Resolution {
                    slice: slice.clone(),
                    ports: entry.ports.clone(),
                })
        })
    }

    /// Egress ports for the flow, empty when no active slice routes it.
    pub fn resolve(
        &self,
        element: ElementId,
        source: &HostAddress,
        destination: &HostAddress,
        active: &ActiveSlices,
    ) -> Vec<PortNo> {
        self.lookup(element, source, destination, active)
            .map(|r| r.ports)
            .unwrap_or_default()
    }

    /// Full pipeline for one packet: classify, resolve, build the rule.
    ///
    /// No rule is built when nothing resolves; the baseline keeps sending
    /// that traffic to the controller.
    pub fn decide(
        &self,
        ctx: PacketContext,
        active: &ActiveSlices,
        tracker: &QueueAvailabilityTracker,
    ) -> Decision {
        let category = classify::classify(&ctx);
        let resolution = self.lookup(ctx.element, &ctx.source, &ctx.destination, active);

        let (slice, ports, rule) = match resolution {
            Some(Resolution { slice, ports }) => {
                let rule = rules::build_flow_rule(&ctx, category, &ports, &self.queues, tracker);
                (Some(slice), ports, Some(rule))
            }
            None => (None, Vec::new(), None),
        };

        debug!(
            element = %ctx.element,
            in_port = %ctx.in_port,
            src = %ctx.source,
            dst = %ctx.destination,
            %category,
            slice = slice.as_ref().map_or("-", SliceId::as_str),
            ports = ?ports,
            "flow decided"
        );

        Decision {
            context: ctx,
            category,
            slice,
            ports,
            rule,
            replayed: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{AddressMode, TrafficCategory, TransportProtocol};
    use crate::scenario::{ScenarioDoc, ScenarioFormat};

    // Two slices disagree on s1's route h1 -> h2; `narrow` also lacks h3.
    const SCENARIO: &str = r#"
version = 1
name = "overlap"

[[hosts]]
name = "h1"
mac = "00:00:00:00:00:01"
ip = "10.0.0.1"

[[hosts]]
name = "h2"
mac = "00:00:00:00:00:02"
ip = "10.0.0.2"

[[hosts]]
name = "h3"
mac = "00:00:00:00:00:03"
ip = "10.0.0.3"

[[elements]]
id = 1
name = "s1"
links = [
  { port = 1, peer = "h1" },
  { port = 2, peer = "h2" },
  { port = 3, peer = "h3" },
  { port = 4, peer = "s2" },
]

[[elements]]
id = 2
name = "s2"
links = [{ port = 1, peer = "s1" }]

[[slices]]
name = "wide"
[[slices.rules]]
element = "s1"
source = "h1"
routes = [
  { destination = "h2", ports = [3] },
  { destination = "h3", ports = [3, 4] },
]

[[slices]]
name = "narrow"
[[slices.rules]]
element = "s1"
source = "h1"
routes = [{ destination = "h2", ports = [2] }]
"#;

    const S1: ElementId = ElementId::new(1);

    fn engine() -> FlowDecisionEngine {
        let doc =
            ScenarioDoc::parse(SCENARIO, ScenarioFormat::Toml, Path::new("overlap.toml")).unwrap();
        let registry = SliceRegistry::from_scenario(&doc, AddressMode::Link).unwrap();
        FlowDecisionEngine::new(Arc::new(registry), QueuePlan::default())
    }

    fn host(n: u8) -> HostAddress {
        format!("00:00:00:00:00:0{n}").parse().unwrap()
    }

    fn active(names: &[&str]) -> ActiveSlices {
        ActiveSlices::new(names.iter().map(|n| SliceId::from(*n)))
    }

    #[test]
    fn single_slice_then_none() {
        let e = engine();
        assert_eq!(e.resolve(S1, &host(1), &host(2), &active(&["wide"])), vec![PortNo::new(3)]);
        assert!(e.resolve(S1, &host(1), &host(2), &active(&[])).is_empty());
    }

    #[test]
    fn first_activated_slice_wins() {
        let e = engine();
        assert_eq!(
            e.resolve(S1, &host(1), &host(2), &active(&["wide", "narrow"])),
            vec![PortNo::new(3)]
        );
        assert_eq!(
            e.resolve(S1, &host(1), &host(2), &active(&["narrow", "wide"])),
            vec![PortNo::new(2)]
        );
    }

    #[test]
    fn later_slice_fills_gaps_without_merging() {
        let e = engine();
        let r = e
            .lookup(S1, &host(1), &host(3), &active(&["narrow", "wide"]))
            .unwrap();
        assert_eq!(r.slice.as_str(), "wide");
        assert_eq!(r.ports, vec![PortNo::new(3), PortNo::new(4)]);
    }

    #[test]
    fn unknown_element_source_or_slice_resolves_empty() {
        let e = engine();
        let all = active(&["wide", "narrow", "ghost"]);
        assert!(e.resolve(ElementId::new(2), &host(1), &host(2), &all).is_empty());
        assert!(e.resolve(S1, &host(2), &host(1), &all).is_empty());
        assert!(e.resolve(S1, &host(1), &host(2), &active(&["ghost"])).is_empty());
    }

    #[test]
    fn resolve_is_deterministic() {
        let e = engine();
        let set = active(&["narrow", "wide"]);
        let first = e.resolve(S1, &host(1), &host(3), &set);
        for _ in 0..16 {
            assert_eq!(e.resolve(S1, &host(1), &host(3), &set), first);
        }
    }

    #[test]
    fn decide_builds_rule_only_on_match() {
        let e = engine();
        let tracker = QueueAvailabilityTracker::new();
        let ctx = PacketContext {
            element: S1,
            in_port: PortNo::new(1),
            source: host(1),
            destination: host(2),
            protocol: TransportProtocol::Udp,
            dst_port: Some(53),
        };

        let d = e.decide(ctx.clone(), &active(&["wide"]), &tracker);
        assert_eq!(d.category, TrafficCategory::Dns);
        assert_eq!(d.slice.as_ref().map(SliceId::as_str), Some("wide"));
        assert_eq!(d.rule.unwrap().output_ports(), vec![PortNo::new(3)]);

        let d = e.decide(ctx, &active(&[]), &tracker);
        assert!(d.rule.is_none());
        assert!(d.ports.is_empty());
    }
}

// ── Flow rule construction ──
//
// Priority 0 and 10 form the baseline every element carries after a
// connect or a resync; priority 100 rules come from resolved packets.

use crate::config::QueuePlan;
use crate::model::{
    ETH_TYPE_IPV4, FlowAction, FlowMatch, FlowRule, IP_PROTO_ICMP, IP_PROTO_TCP, IP_PROTO_UDP,
    PacketContext, PortNo, Priority, TrafficCategory,
};
use crate::store::QueueAvailabilityTracker;

/// Protocol predicates identifying `category`. `General` pins only the
/// IPv4 ethertype.
pub fn category_match(category: TrafficCategory) -> FlowMatch {
    let mut m = FlowMatch {
        eth_type: Some(ETH_TYPE_IPV4),
        ..FlowMatch::default()
    };
    match category {
        TrafficCategory::Http => {
            m.ip_proto = Some(IP_PROTO_TCP);
            m.tcp_dst = Some(80);
        }
        TrafficCategory::Dns => {
            m.ip_proto = Some(IP_PROTO_UDP);
            m.udp_dst = Some(53);
        }
        TrafficCategory::Icmp => m.ip_proto = Some(IP_PROTO_ICMP),
        TrafficCategory::General => {}
    }
    m
}

/// Table-miss rule: everything unmatched goes to the controller.
pub fn table_miss_rule() -> FlowRule {
    FlowRule::new(
        Priority::TABLE_MISS,
        FlowMatch::any(),
        vec![FlowAction::Controller],
    )
}

/// The baseline in install order: the priority-0 table-miss rule, then
/// one priority-10 redirect per redirected category.
pub fn baseline_rules() -> Vec<FlowRule> {
    let mut rules = Vec::with_capacity(1 + TrafficCategory::REDIRECTED.len());
    rules.push(table_miss_rule());
    rules.extend(TrafficCategory::REDIRECTED.iter().map(|category| {
        FlowRule::new(
            Priority::CATEGORY_REDIRECT,
            category_match(*category),
            vec![FlowAction::Controller],
        )
    }));
    rules
}

/// Output actions for `ports`, each preceded by the category queue tag
/// when the element has reported that queue on that port.
pub fn egress_actions(
    ctx: &PacketContext,
    category: TrafficCategory,
    ports: &[PortNo],
    queues: &QueuePlan,
    tracker: &QueueAvailabilityTracker,
) -> Vec<FlowAction> {
    let queue = queues.queue_for(category);
    let mut actions = Vec::with_capacity(ports.len() * 2);
    for &port in ports {
        if let Some(queue) = queue.filter(|q| tracker.has_queue(ctx.element, port, *q)) {
            actions.push(FlowAction::SetQueue { queue });
        }
        actions.push(FlowAction::Output { port });
    }
    actions
}

/// The priority-100 rule that lets the element forward this flow itself.
pub fn build_flow_rule(
    ctx: &PacketContext,
    category: TrafficCategory,
    ports: &[PortNo],
    queues: &QueuePlan,
    tracker: &QueueAvailabilityTracker,
) -> FlowRule {
    let mut flow_match = category_match(category)
        .with_source(&ctx.source)
        .with_destination(&ctx.destination);
    flow_match.in_port = Some(ctx.in_port);

    FlowRule::new(
        Priority::INSTALLED_FLOW,
        flow_match,
        egress_actions(ctx, category, ports, queues, tracker),
    )
}

// ── Scenario validation ──
//
// Turns a decoded `ScenarioDoc` into a `SliceRegistry`. Every reference
// (link peers, rule elements, hosts, via-peers, explicit ports) is checked
// here so that a malformed scenario never reaches runtime resolution.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::{ElementDef, HostDef, RouteDef, ScenarioDoc, SliceDef};
use crate::error::ScenarioError;
use crate::model::{AddressMode, ElementId, HostAddress, PortNo, SliceId};
use crate::store::{RouteEntry, SliceRegistry, SliceTable, Topology, TopologyElement};

pub(crate) fn build_registry(
    doc: &ScenarioDoc,
    mode: AddressMode,
) -> Result<SliceRegistry, ScenarioError> {
    let topology = build_topology(doc, mode)?;

    let mut slices = IndexMap::with_capacity(doc.slices.len());
    for def in &doc.slices {
        let table = build_slice(def, &topology, mode)?;
        match slices.entry(table.id.clone()) {
            Entry::Occupied(_) => {
                return Err(ScenarioError::DuplicateSlice {
                    name: def.name.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(table);
            }
        }
    }

    Ok(SliceRegistry {
        name: doc.name.clone(),
        description: doc.description.clone(),
        mode,
        topology,
        slices,
    })
}

fn address_of(host: &HostDef, mode: AddressMode) -> HostAddress {
    match mode {
        AddressMode::Link => HostAddress::Link(host.mac.clone()),
        AddressMode::Network => HostAddress::Network(host.ip),
    }
}

// ── Topology ─────────────────────────────────────────────────────────

fn build_topology(doc: &ScenarioDoc, mode: AddressMode) -> Result<Topology, ScenarioError> {
    let mut hosts: IndexMap<String, HostDef> = IndexMap::with_capacity(doc.hosts.len());
    let mut by_address: HashMap<HostAddress, String> = HashMap::new();

    for host in &doc.hosts {
        if hosts.contains_key(&host.name) {
            return Err(ScenarioError::DuplicateHost {
                name: host.name.clone(),
            });
        }
        let addr = address_of(host, mode);
        if let Some(first) = by_address.insert(addr.clone(), host.name.clone()) {
            return Err(ScenarioError::DuplicateAddress {
                address: addr.to_string(),
                first,
                second: host.name.clone(),
            });
        }
        hosts.insert(host.name.clone(), host.clone());
    }

    let mut elements: IndexMap<ElementId, TopologyElement> =
        IndexMap::with_capacity(doc.elements.len());
    let mut element_names: HashMap<String, ElementId> = HashMap::new();

    for def in &doc.elements {
        if element_names.contains_key(&def.name) || hosts.contains_key(&def.name) {
            return Err(ScenarioError::DuplicateElement {
                name: def.name.clone(),
            });
        }
        if elements.contains_key(&def.id) {
            return Err(ScenarioError::DuplicateElementId { id: def.id });
        }
        let element = build_element(def)?;
        element_names.insert(def.name.clone(), def.id);
        elements.insert(def.id, element);
    }

    // Peers can only be checked once every name is known.
    for element in elements.values() {
        for (port, peer) in &element.ports {
            if hosts.contains_key(peer) {
                continue;
            }
            let Some(peer_id) = element_names.get(peer) else {
                return Err(ScenarioError::UnknownPeer {
                    element: element.name.clone(),
                    port: *port,
                    peer: peer.clone(),
                });
            };
            let links_back = elements
                .get(peer_id)
                .is_some_and(|other| other.ports.values().any(|p| *p == element.name));
            if !links_back {
                return Err(ScenarioError::OneSidedLink {
                    element: element.name.clone(),
                    port: *port,
                    peer: peer.clone(),
                });
            }
        }
    }

    Ok(Topology {
        elements,
        element_names,
        hosts,
    })
}

fn build_element(def: &ElementDef) -> Result<TopologyElement, ScenarioError> {
    let mut ports = BTreeMap::new();
    for link in &def.links {
        if ports.insert(link.port, link.peer.clone()).is_some() {
            return Err(ScenarioError::DuplicatePort {
                element: def.name.clone(),
                port: link.port,
            });
        }
    }
    Ok(TopologyElement {
        id: def.id,
        name: def.name.clone(),
        ports,
    })
}

// ── Slices ───────────────────────────────────────────────────────────

fn build_slice(
    def: &SliceDef,
    topology: &Topology,
    mode: AddressMode,
) -> Result<SliceTable, ScenarioError> {
    let mut rules: HashMap<ElementId, IndexMap<HostAddress, Vec<RouteEntry>>> = HashMap::new();

    for rule in &def.rules {
        let element = topology.element_by_name(&rule.element).ok_or_else(|| {
            ScenarioError::UnknownElement {
                slice: def.name.clone(),
                element: rule.element.clone(),
            }
        })?;
        let source = lookup_host(topology, def, element, &rule.source, mode)?;

        let mut routes = Vec::with_capacity(rule.routes.len());
        for route in &rule.routes {
            routes.push(build_route(def, topology, element, &rule.source, route, mode)?);
        }

        let by_source = rules.entry(element.id).or_default();
        if by_source.insert(source, routes).is_some() {
            return Err(ScenarioError::DuplicateSource {
                slice: def.name.clone(),
                element: element.name.clone(),
                source_host: rule.source.clone(),
            });
        }
    }

    Ok(SliceTable {
        id: SliceId::new(def.name.clone()),
        description: def.description.clone(),
        rules,
    })
}

fn lookup_host(
    topology: &Topology,
    slice: &SliceDef,
    element: &TopologyElement,
    name: &str,
    mode: AddressMode,
) -> Result<HostAddress, ScenarioError> {
    topology
        .host(name)
        .map(|h| address_of(h, mode))
        .ok_or_else(|| ScenarioError::UnknownHost {
            slice: slice.name.clone(),
            element: element.name.clone(),
            host: name.into(),
        })
}

fn build_route(
    slice: &SliceDef,
    topology: &Topology,
    element: &TopologyElement,
    source_name: &str,
    route: &RouteDef,
    mode: AddressMode,
) -> Result<RouteEntry, ScenarioError> {
    let destination = lookup_host(topology, slice, element, &route.destination, mode)?;

    let mut ports: Vec<PortNo> = Vec::with_capacity(route.via.len() + route.ports.len());

    for peer in &route.via {
        let port = element
            .ports
            .iter()
            .find_map(|(port, linked)| (linked == peer).then_some(*port))
            .ok_or_else(|| ScenarioError::PeerNotLinked {
                slice: slice.name.clone(),
                element: element.name.clone(),
                peer: peer.clone(),
            })?;
        if !ports.contains(&port) {
            ports.push(port);
        }
    }

    for port in &route.ports {
        if !element.ports.contains_key(port) {
            return Err(ScenarioError::UndeclaredPort {
                slice: slice.name.clone(),
                element: element.name.clone(),
                port: *port,
            });
        }
        if !ports.contains(port) {
            ports.push(*port);
        }
    }

    if ports.is_empty() {
        return Err(ScenarioError::EmptyRoute {
            slice: slice.name.clone(),
            element: element.name.clone(),
            source_host: source_name.into(),
            destination: route.destination.clone(),
        });
    }

    Ok(RouteEntry { destination, ports })
}

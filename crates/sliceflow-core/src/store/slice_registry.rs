// ── Slice registry ──
//
// Immutable, validated lookup tables produced from a scenario. Built once
// at startup and shared read-only (`Arc<SliceRegistry>`) by every
// decision; no synchronization needed.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{CoreError, ScenarioError};
use crate::model::{AddressMode, ElementId, HostAddress, PortNo, SliceId};
use crate::scenario::{HostDef, ScenarioDoc};

/// One resolved route: traffic for `destination` leaves on `ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub destination: HostAddress,
    /// Egress ports in declared order. More than one means fan-out.
    pub ports: Vec<PortNo>,
}

/// An element as declared by the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyElement {
    pub id: ElementId,
    pub name: String,
    /// Declared port → peer name.
    pub ports: BTreeMap<PortNo, String>,
}

/// Hosts, elements and links of the deployment.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub(crate) elements: IndexMap<ElementId, TopologyElement>,
    pub(crate) element_names: HashMap<String, ElementId>,
    pub(crate) hosts: IndexMap<String, HostDef>,
}

impl Topology {
    pub fn element(&self, id: ElementId) -> Option<&TopologyElement> {
        self.elements.get(&id)
    }

    pub fn element_by_name(&self, name: &str) -> Option<&TopologyElement> {
        self.element_names
            .get(name)
            .and_then(|id| self.elements.get(id))
    }

    pub fn elements(&self) -> impl Iterator<Item = &TopologyElement> {
        self.elements.values()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostDef> {
        self.hosts.values()
    }

    pub fn host(&self, name: &str) -> Option<&HostDef> {
        self.hosts.get(name)
    }

    /// Ports declared for `element`, ascending. Empty for unknown elements.
    pub fn declared_ports(&self, element: ElementId) -> Vec<PortNo> {
        self.elements
            .get(&element)
            .map(|e| e.ports.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn link_count(&self) -> usize {
        self.elements.values().map(|e| e.ports.len()).sum()
    }
}

/// A validated slice: per element, per source, the ordered routes.
#[derive(Debug, Clone)]
pub struct SliceTable {
    pub id: SliceId,
    pub description: Option<String>,
    pub(crate) rules: HashMap<ElementId, IndexMap<HostAddress, Vec<RouteEntry>>>,
}

impl SliceTable {
    /// Elements this slice defines rules for.
    pub fn elements(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.rules.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of (element, source, destination) routes.
    pub fn route_count(&self) -> usize {
        self.rules
            .values()
            .flat_map(IndexMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn routes(&self, element: ElementId, source: &HostAddress) -> &[RouteEntry] {
        self.rules
            .get(&element)
            .and_then(|by_source| by_source.get(source))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Read-only table of every slice in a scenario.
#[derive(Debug, Clone)]
pub struct SliceRegistry {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) mode: AddressMode,
    pub(crate) topology: Topology,
    pub(crate) slices: IndexMap<SliceId, SliceTable>,
}

impl SliceRegistry {
    /// Validate a decoded scenario and build the lookup tables.
    pub fn from_scenario(doc: &ScenarioDoc, mode: AddressMode) -> Result<Self, ScenarioError> {
        crate::scenario::build_registry(doc, mode)
    }

    /// Read, decode and validate a scenario file.
    pub fn load(path: &Path, mode: AddressMode) -> Result<Self, CoreError> {
        let doc = ScenarioDoc::load(path)?;
        Ok(Self::from_scenario(&doc, mode)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Slice ids in declaration order.
    pub fn slice_ids(&self) -> impl Iterator<Item = &SliceId> {
        self.slices.keys()
    }

    pub fn slices(&self) -> impl Iterator<Item = &SliceTable> {
        self.slices.values()
    }

    pub fn slice(&self, id: &SliceId) -> Option<&SliceTable> {
        self.slices.get(id)
    }

    pub fn contains_slice(&self, id: &SliceId) -> bool {
        self.slices.contains_key(id)
    }

    /// Ordered routes `slice` defines for traffic from `source` at `element`.
    ///
    /// Empty when the slice, the element or the source is unknown.
    pub fn entries_for(
        &self,
        element: ElementId,
        slice: &SliceId,
        source: &HostAddress,
    ) -> &[RouteEntry] {
        self.slices
            .get(slice)
            .map(|table| table.routes(element, source))
            .unwrap_or(&[])
    }

    /// Address of a named host in this registry's address mode.
    pub fn host_address(&self, name: &str) -> Option<HostAddress> {
        self.topology.host(name).map(|h| match self.mode {
            AddressMode::Link => HostAddress::Link(h.mac.clone()),
            AddressMode::Network => HostAddress::Network(h.ip),
        })
    }

    /// Ports to request queue configuration for when `element` connects.
    pub fn declared_ports(&self, element: ElementId) -> Vec<PortNo> {
        self.topology.declared_ports(element)
    }

    /// Topology name for `element`, if declared.
    pub fn element_name(&self, element: ElementId) -> Option<&str> {
        self.topology.element(element).map(|e| e.name.as_str())
    }
}

//! `sliceflow resolve`: one-shot egress lookup without a running controller.

use std::sync::Arc;

use serde::Serialize;

use sliceflow_core::{
    ActiveSlices, ElementId, FlowDecisionEngine, HostAddress, PortNo, QueuePlan, SliceId,
    SliceRegistry,
};

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::config::Workspace;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ResolveOutput {
    element: ElementId,
    #[serde(skip_serializing_if = "Option::is_none")]
    element_name: Option<String>,
    source: HostAddress,
    destination: HostAddress,
    active: ActiveSlices,
    slice: Option<SliceId>,
    ports: Vec<PortNo>,
}

/// Numeric ids are taken as given; names must be declared.
fn lookup_element(registry: &SliceRegistry, raw: &str) -> Result<ElementId, CliError> {
    if let Ok(id) = raw.parse::<ElementId>() {
        return Ok(id);
    }
    registry
        .topology()
        .element_by_name(raw)
        .map(|e| e.id)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "element".into(),
            identifier: raw.into(),
            list_command: "check".into(),
        })
}

/// Host name first, then a literal address in the scenario's mode.
fn lookup_host(registry: &SliceRegistry, field: &str, raw: &str) -> Result<HostAddress, CliError> {
    if let Some(addr) = registry.host_address(raw) {
        return Ok(addr);
    }
    let addr: HostAddress = raw.parse().map_err(|_| CliError::NotFound {
        resource_type: "host".into(),
        identifier: raw.into(),
        list_command: "check".into(),
    })?;
    if addr.mode() != registry.mode() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!(
                "{raw} is a {} address but the scenario is loaded in {} mode",
                addr.mode(),
                registry.mode()
            ),
        });
    }
    Ok(addr)
}

fn detail(r: &ResolveOutput) -> String {
    let element = r
        .element_name
        .as_ref()
        .map_or_else(|| r.element.to_string(), |name| format!("{name} ({})", r.element));
    let Some(slice) = &r.slice else {
        return format!(
            "{element}: {} -> {} has no route in the active slices",
            r.source, r.destination
        );
    };
    let ports: Vec<String> = r.ports.iter().map(ToString::to_string).collect();
    format!(
        "{element}: {} -> {} leaves on port {} (slice '{slice}')",
        r.source,
        r.destination,
        ports.join(", ")
    )
}

pub fn handle(ws: &Workspace, args: &ResolveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let registry = &ws.registry;
    let element = lookup_element(registry, args.element.trim())?;
    let source = lookup_host(registry, "source", args.source.trim())?;
    let destination = lookup_host(registry, "destination", args.destination.trim())?;

    let active = match args.active.as_deref() {
        Some(names) => ws.slice_ids(names)?,
        None => ws.slice_ids(&ws.profile.initial_slices)?,
    };
    let active = ActiveSlices::new(active);

    let engine = FlowDecisionEngine::new(Arc::clone(registry), QueuePlan::default());
    let resolution = engine.lookup(element, &source, &destination, &active);

    let result = ResolveOutput {
        element,
        element_name: registry.element_name(element).map(str::to_owned),
        source,
        destination,
        active,
        slice: resolution.as_ref().map(|r| r.slice.clone()),
        ports: resolution.map(|r| r.ports).unwrap_or_default(),
    };

    let rendered = output::render_single(&global.output, &result, detail, |r| {
        r.ports
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

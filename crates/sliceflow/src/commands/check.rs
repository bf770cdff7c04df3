//! `sliceflow check`: load and validate a scenario.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use sliceflow_core::{AddressMode, SliceRegistry};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::slices::SliceSummary;

#[derive(Debug, Serialize)]
struct ScenarioSummary {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    path: PathBuf,
    address_mode: AddressMode,
    elements: usize,
    hosts: usize,
    links: usize,
    slices: Vec<SliceSummary>,
}

impl ScenarioSummary {
    fn new(path: PathBuf, registry: &SliceRegistry) -> Self {
        let topology = registry.topology();
        Self {
            name: registry.name().to_owned(),
            description: registry.description().map(str::to_owned),
            path,
            address_mode: registry.mode(),
            elements: topology.elements().count(),
            hosts: topology.hosts().count(),
            links: topology.link_count(),
            slices: SliceSummary::all(registry),
        }
    }
}

fn detail(s: &ScenarioSummary, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({})",
        output::status_mark(true, color),
        output::heading(&s.name, color),
        s.path.display()
    );
    if let Some(ref description) = s.description {
        let _ = writeln!(out, "  {description}");
    }
    let _ = writeln!(out, "  address mode: {}", s.address_mode);
    let _ = writeln!(
        out,
        "  topology:     {} elements, {} hosts, {} links",
        s.elements, s.hosts, s.links
    );
    let _ = write!(out, "  slices:       {}", s.slices.len());
    for slice in &s.slices {
        let _ = write!(
            out,
            "\n    {:<12} {} elements, {} routes",
            slice.name, slice.elements, slice.routes
        );
    }
    out
}

pub fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ws = config::open_workspace(global, args.path.as_deref())?;
    let summary = ScenarioSummary::new(ws.scenario.clone(), &ws.registry);
    let color = output::should_color(&global.color);

    let rendered = output::render_single(
        &global.output,
        &summary,
        |s| detail(s, color),
        |s| s.name.clone(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

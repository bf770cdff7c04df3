//! `sliceflow slices`: what the scenario defines.

use serde::Serialize;
use tabled::Tabled;

use sliceflow_core::{SliceId, SliceRegistry};

use crate::cli::GlobalOpts;
use crate::config::Workspace;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Serialize)]
pub struct SliceSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub elements: usize,
    pub routes: usize,
    /// Active at startup under the selected profile.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub initial: bool,
}

impl SliceSummary {
    pub fn all(registry: &SliceRegistry) -> Vec<Self> {
        registry
            .slices()
            .map(|table| Self {
                name: table.id.to_string(),
                description: table.description.clone(),
                elements: table.elements().len(),
                routes: table.route_count(),
                initial: false,
            })
            .collect()
    }
}

#[derive(Tabled)]
struct SliceRow {
    #[tabled(rename = "Slice")]
    name: String,
    #[tabled(rename = "Elements")]
    elements: usize,
    #[tabled(rename = "Routes")]
    routes: usize,
    #[tabled(rename = "Startup")]
    initial: &'static str,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&SliceSummary> for SliceRow {
    fn from(s: &SliceSummary) -> Self {
        Self {
            name: s.name.clone(),
            elements: s.elements,
            routes: s.routes,
            initial: if s.initial { "on" } else { "" },
            description: s.description.clone().unwrap_or_default(),
        }
    }
}

pub fn handle(ws: &Workspace, global: &GlobalOpts) -> Result<(), CliError> {
    let initial: Vec<SliceId> = ws
        .profile
        .initial_slices
        .iter()
        .map(|s| SliceId::new(s.trim()))
        .collect();

    let mut slices = SliceSummary::all(&ws.registry);
    for slice in &mut slices {
        slice.initial = initial.iter().any(|id| id.as_str() == slice.name);
    }

    let rendered = output::render_list(&global.output, &slices, |s| SliceRow::from(s), |s| {
        s.name.clone()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

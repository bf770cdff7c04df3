//! `sliceflow run`: the controller behind a stdin/stdout JSON-lines bridge.

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::info;

use sliceflow_core::{ChannelSouthbound, Controller, QueueProvisioner};

use crate::bridge::{self, BridgeSummary};
use crate::cli::RunArgs;
use crate::config::{self, Workspace};
use crate::error::CliError;

pub async fn handle(ws: &Workspace, args: &RunArgs) -> Result<(), CliError> {
    let engine = ws.engine_config(args.active.as_deref())?;
    let provisioner = if args.no_provisioner {
        None
    } else {
        config::profile_to_provisioner(&ws.profile)?
            .map(|p| Arc::new(p) as Arc<dyn QueueProvisioner>)
    };
    let has_provisioner = provisioner.is_some();

    let (southbound, rx) = ChannelSouthbound::new();
    let controller = Controller::new(
        Arc::clone(&ws.registry),
        engine,
        Arc::new(southbound),
        provisioner,
    )?;
    controller.start().await?;

    info!(
        profile = %ws.profile_name,
        scenario = %ws.scenario.display(),
        mode = %ws.registry.mode(),
        active = ?controller.active_slices().names(),
        provisioner = has_provisioner,
        "controller running"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let served = tokio::select! {
        result = bridge::serve(&controller, rx, stdin, tokio::io::stdout()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(BridgeSummary::default())
        }
    };

    controller.shutdown().await;
    let summary = served?;
    let stats = controller.stats();
    info!(
        requests = summary.requests,
        rejected = summary.rejected,
        commands = summary.commands,
        decisions = stats.decisions,
        forwarded = stats.forwarded,
        discarded = stats.discarded,
        resyncs = stats.resyncs,
        "controller stopped"
    );
    Ok(())
}

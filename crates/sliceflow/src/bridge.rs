//! JSON-lines bridge between a transport process and the controller.
//!
//! Each stdin line is one transport event or control request. Southbound
//! commands and replies go to stdout, one JSON object per line. Commands
//! produced while handling a request are always written before its reply.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use sliceflow_core::{
    ActiveSlices, BandwidthSplit, Command, CommandResult, Controller, ControllerStats, Decision,
    Element, ElementCommand, ElementEvent, ElementId, FlowAction, FlowRule, Outbound,
    PacketPayload, PortNo, QueueId, ResyncReport, SliceId,
};

use crate::error::CliError;

// ── Wire input ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeInput {
    Connected {
        element: ElementId,
    },
    Disconnected {
        element: ElementId,
    },
    PacketIn {
        element: ElementId,
        in_port: PortNo,
        #[serde(default)]
        buffer_id: Option<u32>,
        /// Whole Ethernet frame, hex encoded.
        frame: String,
    },
    QueueConfig {
        element: ElementId,
        port: PortNo,
        queues: Vec<QueueId>,
    },
    Toggle {
        slice: String,
    },
    Bandwidth {
        values: Vec<f64>,
    },
    Resync,
    Status,
}

impl BridgeInput {
    fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::PacketIn { .. } => "packet_in",
            Self::QueueConfig { .. } => "queue_config",
            Self::Toggle { .. } => "toggle",
            Self::Bandwidth { .. } => "bandwidth",
            Self::Resync => "resync",
            Self::Status => "status",
        }
    }
}

// ── Wire output ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireCommand {
    InstallRule {
        rule: FlowRule,
    },
    DeleteAllRules,
    ReplayPacket {
        in_port: PortNo,
        #[serde(skip_serializing_if = "Option::is_none")]
        buffer_id: Option<u32>,
        /// Hex-encoded frame when the element did not buffer it.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        actions: Vec<FlowAction>,
    },
    RequestQueueConfig {
        port: PortNo,
    },
}

impl From<ElementCommand> for WireCommand {
    fn from(command: ElementCommand) -> Self {
        match command {
            ElementCommand::InstallRule(rule) => Self::InstallRule { rule },
            ElementCommand::DeleteAllRules => Self::DeleteAllRules,
            ElementCommand::ReplayPacket {
                in_port,
                payload,
                actions,
            } => {
                let (buffer_id, data) = match payload {
                    PacketPayload::Buffered(id) => (Some(id), None),
                    PacketPayload::Raw(frame) => (None, Some(hex::encode(frame))),
                };
                Self::ReplayPacket {
                    in_port,
                    buffer_id,
                    data,
                    actions,
                }
            }
            ElementCommand::RequestQueueConfig { port } => Self::RequestQueueConfig { port },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeOutput {
    Command {
        element: ElementId,
        command: WireCommand,
    },
    Decision {
        decision: Decision,
    },
    Discarded {
        element: ElementId,
    },
    Toggled {
        active: Arc<ActiveSlices>,
        resync: ResyncReport,
    },
    Resynced {
        resync: ResyncReport,
    },
    Bandwidth {
        split: BandwidthSplit,
    },
    Status {
        active: Arc<ActiveSlices>,
        elements: Arc<Vec<Arc<Element>>>,
        stats: ControllerStats,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_resync: Option<Arc<ResyncReport>>,
    },
    Error {
        request: String,
        message: String,
    },
}

impl From<Outbound> for BridgeOutput {
    fn from(out: Outbound) -> Self {
        Self::Command {
            element: out.element,
            command: out.command.into(),
        }
    }
}

fn error_reply(request: &str, message: String) -> BridgeOutput {
    BridgeOutput::Error {
        request: request.to_owned(),
        message,
    }
}

// ── Serve loop ───────────────────────────────────────────────────────

/// Counts reported when the input stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeSummary {
    pub requests: u64,
    pub rejected: u64,
    pub commands: u64,
}

/// Serializes writes so every line lands whole.
struct LineWriter<W> {
    inner: W,
    commands: u64,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    async fn write(&mut self, out: &BridgeOutput) -> Result<(), CliError> {
        let mut line = serde_json::to_vec(out).map_err(|e| CliError::Render(e.to_string()))?;
        line.push(b'\n');
        self.inner.write_all(&line).await?;
        self.inner.flush().await?;
        if matches!(out, BridgeOutput::Command { .. }) {
            self.commands += 1;
        }
        Ok(())
    }

    async fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Result<(), CliError> {
        while let Ok(out) = rx.try_recv() {
            self.write(&out.into()).await?;
        }
        Ok(())
    }
}

/// Background bandwidth requests and their replies.
struct Deferred {
    tx: mpsc::UnboundedSender<BridgeOutput>,
    pending: usize,
}

/// Run the bridge until `reader` hits EOF and every background request
/// has answered.
///
/// `southbound` is the receiving half of the controller's channel
/// southbound. Bandwidth requests run in the background so a slow
/// provisioner does not hold up packet handling.
pub async fn serve<R, W>(
    controller: &Controller,
    mut southbound: mpsc::UnboundedReceiver<Outbound>,
    reader: R,
    writer: W,
) -> Result<BridgeSummary, CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut out = LineWriter {
        inner: writer,
        commands: 0,
    };
    let (tx, mut replies) = mpsc::unbounded_channel();
    let mut deferred = Deferred { tx, pending: 0 };
    let mut summary = BridgeSummary::default();
    let mut input_open = true;

    while input_open || deferred.pending > 0 {
        let reply = tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    None => {
                        input_open = false;
                        None
                    }
                    Some(line) if line.trim().is_empty() => None,
                    Some(line) => {
                        summary.requests += 1;
                        match serde_json::from_str::<BridgeInput>(&line) {
                            Ok(input) => handle(controller, input, &mut deferred).await,
                            Err(e) => Some(error_reply("parse", e.to_string())),
                        }
                    }
                }
            }
            Some(reply) = replies.recv(), if deferred.pending > 0 => {
                deferred.pending -= 1;
                Some(reply)
            }
            Some(cmd) = southbound.recv() => {
                out.write(&cmd.into()).await?;
                None
            }
        };

        out.drain(&mut southbound).await?;
        if let Some(reply) = reply {
            if matches!(reply, BridgeOutput::Error { .. }) {
                summary.rejected += 1;
            }
            out.write(&reply).await?;
        }
    }

    out.drain(&mut southbound).await?;
    summary.commands = out.commands;
    Ok(summary)
}

/// Apply one request. `None` means nothing to answer yet.
async fn handle(
    controller: &Controller,
    input: BridgeInput,
    deferred: &mut Deferred,
) -> Option<BridgeOutput> {
    let kind = input.kind();
    debug!(request = kind, "bridge request");

    let event = match input {
        BridgeInput::Connected { element } => ElementEvent::Connected { element },
        BridgeInput::Disconnected { element } => ElementEvent::Disconnected { element },
        BridgeInput::QueueConfig {
            element,
            port,
            queues,
        } => ElementEvent::QueueConfig {
            element,
            port,
            queues,
        },
        BridgeInput::PacketIn {
            element,
            in_port,
            buffer_id,
            frame,
        } => match hex::decode(frame.trim()) {
            Ok(bytes) => ElementEvent::PacketIn {
                element,
                in_port,
                buffer_id,
                frame: Bytes::from(bytes),
            },
            Err(e) => return Some(error_reply(kind, format!("frame is not valid hex: {e}"))),
        },

        BridgeInput::Toggle { slice } => {
            let cmd = Command::ToggleSlice {
                slice: SliceId::new(slice),
            };
            return Some(match controller.execute(cmd).await {
                Ok(CommandResult::Toggled { active, report }) => BridgeOutput::Toggled {
                    active,
                    resync: report,
                },
                Ok(CommandResult::Resynced(report)) => BridgeOutput::Resynced { resync: report },
                Err(e) => error_reply(kind, e.to_string()),
            });
        }
        BridgeInput::Resync => {
            return Some(match controller.execute(Command::Resync).await {
                Ok(result) => BridgeOutput::Resynced {
                    resync: result.report().clone(),
                },
                Err(e) => error_reply(kind, e.to_string()),
            });
        }
        BridgeInput::Bandwidth { values } => {
            let controller = controller.clone();
            let tx = deferred.tx.clone();
            deferred.pending += 1;
            tokio::spawn(async move {
                let reply = match controller.set_bandwidth_split(&values).await {
                    Ok(split) => BridgeOutput::Bandwidth { split },
                    Err(e) => {
                        warn!(error = %e, "bandwidth request rejected");
                        error_reply("bandwidth", e.to_string())
                    }
                };
                let _ = tx.send(reply);
            });
            return None;
        }
        BridgeInput::Status => {
            return Some(BridgeOutput::Status {
                active: controller.active_slices(),
                elements: controller.elements_snapshot(),
                stats: controller.stats(),
                last_resync: controller.last_resync(),
            });
        }
    };

    let element = event.element();
    let is_packet = matches!(event, ElementEvent::PacketIn { .. });
    match controller.handle_event(event) {
        Ok(Some(decision)) => Some(BridgeOutput::Decision { decision }),
        Ok(None) if is_packet => Some(BridgeOutput::Discarded { element }),
        Ok(None) => None,
        Err(e) => Some(error_reply(kind, e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use serde_json::Value;
    use sliceflow_core::{AddressMode, ChannelSouthbound, EngineConfig, SliceRegistry};

    use super::*;

    fn scenario_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/four_switch.toml")
    }

    async fn controller(initial: &[&str]) -> (Controller, mpsc::UnboundedReceiver<Outbound>) {
        let registry = SliceRegistry::load(&scenario_path(), AddressMode::Link).unwrap();
        let (sb, rx) = ChannelSouthbound::new();
        let config = EngineConfig {
            initial_slices: initial.iter().map(|s| SliceId::new(*s)).collect(),
            ..EngineConfig::default()
        };
        let controller = Controller::new(Arc::new(registry), config, Arc::new(sb), None).unwrap();
        controller.start().await.unwrap();
        (controller, rx)
    }

    /// TCP/80 from host `src` to host `dst`, hex encoded.
    fn http_frame(src: u8, dst: u8) -> String {
        let mut f = vec![0, 0, 0, 0, 0, dst, 0, 0, 0, 0, 0, src, 0x08, 0x00];
        let mut ip = [0u8; 20];
        ip[0] = 0x45;
        ip[9] = 6;
        ip[12..16].copy_from_slice(&[10, 0, 0, src]);
        ip[16..20].copy_from_slice(&[10, 0, 0, dst]);
        f.extend_from_slice(&ip);
        f.extend_from_slice(&40000u16.to_be_bytes());
        f.extend_from_slice(&80u16.to_be_bytes());
        hex::encode(f)
    }

    async fn run(initial: &[&str], input: &str) -> (Vec<Value>, BridgeSummary) {
        let (controller, rx) = controller(initial).await;
        let mut written = Vec::new();
        let summary = serve(&controller, rx, input.as_bytes(), &mut written)
            .await
            .unwrap();
        controller.shutdown().await;
        let lines = String::from_utf8(written)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (lines, summary)
    }

    fn kinds(lines: &[Value]) -> Vec<String> {
        lines
            .iter()
            .map(|l| match l["type"].as_str().unwrap() {
                "command" => l["command"]["kind"].as_str().unwrap().to_owned(),
                other => other.to_owned(),
            })
            .collect()
    }

    #[tokio::test]
    async fn connect_emits_queue_requests_then_baseline() {
        let (lines, summary) = run(&[], r#"{"type":"connected","element":1}"#).await;
        let kinds = kinds(&lines);

        let split = kinds.iter().position(|k| k == "install_rule").unwrap();
        assert!(split > 0);
        assert!(kinds[..split].iter().all(|k| k == "request_queue_config"));
        assert_eq!(kinds[split..], ["install_rule"; 4]);
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.commands, u64::try_from(lines.len()).unwrap());
    }

    #[tokio::test]
    async fn packet_in_writes_rule_and_replay_before_decision() {
        let input = format!(
            "{}\n{}\n",
            r#"{"type":"connected","element":1}"#,
            serde_json::json!({
                "type": "packet_in",
                "element": 1,
                "in_port": 1,
                "buffer_id": 7,
                "frame": http_frame(1, 6),
            })
        );
        let (lines, _) = run(&["first"], &input).await;
        let tail = &lines[lines.len() - 3..];

        assert_eq!(kinds(tail), ["install_rule", "replay_packet", "decision"]);
        assert_eq!(tail[0]["command"]["rule"]["priority"], 100);
        assert_eq!(tail[1]["command"]["buffer_id"], 7);
        assert!(tail[1]["command"].get("data").is_none());
        assert_eq!(tail[2]["decision"]["slice"], "first");
        assert_eq!(tail[2]["decision"]["category"], "http");
    }

    #[tokio::test]
    async fn malformed_requests_are_answered_not_fatal() {
        let input = [
            "not json",
            r#"{"type":"packet_in","element":1,"in_port":1,"frame":"zz"}"#,
            r#"{"type":"toggle","slice":"fourth"}"#,
            r#"{"type":"status"}"#,
        ]
        .join("\n");
        let (lines, summary) = run(&[], &input).await;

        assert_eq!(kinds(&lines), ["error", "error", "error", "status"]);
        assert_eq!(lines[0]["request"], "parse");
        assert_eq!(lines[1]["request"], "packet_in");
        assert_eq!(lines[2]["request"], "toggle");
        assert_eq!(summary.requests, 4);
        assert_eq!(summary.rejected, 3);
    }

    #[tokio::test]
    async fn toggle_resyncs_connected_elements_before_reply() {
        let input = [
            r#"{"type":"connected","element":2}"#,
            r#"{"type":"toggle","slice":"second"}"#,
        ]
        .join("\n");
        let (lines, _) = run(&["first"], &input).await;
        let kinds = kinds(&lines);

        let toggled = kinds.iter().position(|k| k == "delete_all_rules").unwrap();
        assert_eq!(
            kinds[toggled..],
            [
                "delete_all_rules",
                "install_rule",
                "install_rule",
                "install_rule",
                "install_rule",
                "toggled"
            ]
        );
        let reply = lines.last().unwrap();
        assert_eq!(reply["active"], serde_json::json!(["first", "second"]));
        assert_eq!(reply["resync"]["completed"], serde_json::json!([2]));
    }

    #[tokio::test]
    async fn bandwidth_reply_arrives_after_input_ends() {
        let (lines, summary) = run(&[], r#"{"type":"bandwidth","values":[4,3,3]}"#).await;
        assert_eq!(kinds(&lines), ["error"]);
        assert_eq!(lines[0]["request"], "bandwidth");
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn raw_replay_is_hex_encoded() {
        let cmd = ElementCommand::ReplayPacket {
            in_port: PortNo::new(2),
            payload: PacketPayload::Raw(Bytes::from_static(&[0xde, 0xad])),
            actions: vec![FlowAction::Output {
                port: PortNo::new(3),
            }],
        };
        let wire = serde_json::to_value(WireCommand::from(cmd)).unwrap();
        assert_eq!(wire["kind"], "replay_packet");
        assert_eq!(wire["data"], "dead");
        assert!(wire.get("buffer_id").is_none());
    }
}

// ── Controller abstraction ──
//
// Owns one engine instance: the slice registry, the active set, the queue
// tracker and the element registry, plus the southbound and the queue
// provisioner. Transport events are handled inline; configuration changes
// go through the command processor task so resyncs never interleave.
// Packet-ins hold the flow gate shared from snapshot to replay and resyncs
// hold it exclusively, so a learned rule never lands after the wipe that
// invalidates it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::EngineConfig;
use crate::engine::sync::FlowTableSynchronizer;
use crate::engine::{FlowDecisionEngine, ResyncReport, parse_frame};
use crate::error::CoreError;
use crate::event::{Decision, ElementEvent};
use crate::model::{Element, ElementId, HostAddress, PacketContext, PortNo, SliceId};
use crate::provision::{BandwidthSplit, QueueProvisioner};
use crate::southbound::{Dispatcher, ElementCommand, PacketPayload, Southbound};
use crate::store::{
    ActiveSliceSet, ActiveSlices, ElementRegistry, QueueAvailabilityTracker, SliceRegistry,
};
use crate::stream::SnapshotStream;

// ── ControllerState ──────────────────────────────────────────────

/// Lifecycle of the controller itself (not of any element).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Running,
    Stopped,
}

/// Packet-in counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Packet-ins that produced a decision.
    pub decisions: u64,
    /// Decisions whose rule reached the element.
    pub forwarded: u64,
    /// Packet-ins dropped before classification (not IPv4, truncated).
    pub discarded: u64,
    pub resyncs: u64,
}

#[derive(Default)]
struct Counters {
    decisions: AtomicU64,
    forwarded: AtomicU64,
    discarded: AtomicU64,
    resyncs: AtomicU64,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for transports and control surfaces.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: EngineConfig,
    engine: FlowDecisionEngine,
    active: ActiveSliceSet,
    queues: QueueAvailabilityTracker,
    elements: Arc<ElementRegistry>,
    dispatcher: Dispatcher,
    synchronizer: FlowTableSynchronizer,
    provisioner: Option<Arc<dyn QueueProvisioner>>,
    state: watch::Sender<ControllerState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    counters: Counters,
    last_resync: ArcSwapOption<ResyncReport>,
    flow_gate: RwLock<()>,
}

impl Controller {
    /// Build a controller over a loaded registry. Does NOT start the
    /// command processor; call [`start()`](Self::start).
    ///
    /// The initial active slices are applied without a resync: no element
    /// is connected yet.
    pub fn new(
        registry: Arc<SliceRegistry>,
        config: EngineConfig,
        southbound: Arc<dyn Southbound>,
        provisioner: Option<Arc<dyn QueueProvisioner>>,
    ) -> Result<Self, CoreError> {
        if config.address_mode != registry.mode() {
            return Err(CoreError::Config {
                message: format!(
                    "address mode {} does not match the scenario's {}",
                    config.address_mode,
                    registry.mode()
                ),
            });
        }
        if let Some(unknown) = config
            .initial_slices
            .iter()
            .find(|id| !registry.contains_slice(id))
        {
            return Err(CoreError::SliceNotFound {
                name: unknown.to_string(),
            });
        }

        let active = ActiveSliceSet::new(ActiveSlices::new(config.initial_slices.iter().cloned()));
        let elements = Arc::new(ElementRegistry::new());
        let dispatcher = Dispatcher::new(southbound, Arc::clone(&elements));
        let synchronizer = FlowTableSynchronizer::new(dispatcher.clone(), Arc::clone(&elements));
        let engine = FlowDecisionEngine::new(registry, config.queues);
        let (state, _) = watch::channel(ControllerState::Idle);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                engine,
                active,
                queues: QueueAvailabilityTracker::new(),
                elements,
                dispatcher,
                synchronizer,
                provisioner,
                state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                counters: Counters::default(),
                last_resync: ArcSwapOption::empty(),
                flow_gate: RwLock::new(()),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<SliceRegistry> {
        self.inner.engine.registry()
    }

    pub fn engine(&self) -> &FlowDecisionEngine {
        &self.inner.engine
    }

    pub fn queues(&self) -> &QueueAvailabilityTracker {
        &self.inner.queues
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the command processor. Calling it twice is harmless.
    pub async fn start(&self) -> Result<(), CoreError> {
        if *self.inner.state.borrow() == ControllerState::Stopped {
            return Err(CoreError::ControllerStopped);
        }

        let mut handles = self.inner.task_handles.lock().await;
        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx)));
        }

        self.inner.state.send_replace(ControllerState::Running);
        info!(
            scenario = self.registry().name(),
            active = ?self.active_slices().names(),
            "controller started"
        );
        Ok(())
    }

    /// Cancel background tasks and wait for them. Commands still queued
    /// are answered with `ControllerStopped`.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.state.send_replace(ControllerState::Stopped);
        debug!("controller stopped");
    }

    pub fn state(&self) -> watch::Receiver<ControllerState> {
        self.inner.state.subscribe()
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command through the command processor and await the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.state.borrow() != ControllerState::Running {
            return Err(CoreError::ControllerStopped);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    /// Toggle a slice and return the new active set, oldest first.
    pub async fn toggle_slice(
        &self,
        slice: impl Into<SliceId>,
    ) -> Result<Arc<ActiveSlices>, CoreError> {
        let cmd = Command::ToggleSlice {
            slice: slice.into(),
        };
        match self.execute(cmd).await? {
            CommandResult::Toggled { active, .. } => Ok(active),
            CommandResult::Resynced(_) => Err(CoreError::Internal(
                "toggle answered with a plain resync".into(),
            )),
        }
    }

    /// Validate a split and hand it to the queue provisioner.
    ///
    /// An invalid split never reaches the provisioner. Provisioner
    /// failures are returned as-is and not retried.
    pub async fn set_bandwidth_split(&self, values: &[f64]) -> Result<BandwidthSplit, CoreError> {
        let split = BandwidthSplit::new(values)?;
        let provisioner = self.inner.provisioner.as_ref().ok_or_else(|| CoreError::Config {
            message: "no queue provisioner is configured".into(),
        })?;
        info!(%split, "applying bandwidth split");
        provisioner.provision(split).await?;
        Ok(split)
    }

    // ── Transport events ─────────────────────────────────────────

    /// Apply one transport event. Packet-ins that survive parsing yield
    /// their `Decision`; every other event yields `None`.
    pub fn handle_event(&self, event: ElementEvent) -> Result<Option<Decision>, CoreError> {
        match event {
            ElementEvent::Connected { element } => {
                self.on_connected(element)?;
                Ok(None)
            }
            ElementEvent::Disconnected { element } => {
                self.on_disconnected(element);
                Ok(None)
            }
            ElementEvent::PacketIn {
                element,
                in_port,
                buffer_id,
                frame,
            } => {
                let Some(ctx) =
                    parse_frame(element, in_port, &frame, self.inner.config.address_mode)
                else {
                    self.inner.counters.discarded.fetch_add(1, Ordering::Relaxed);
                    debug!(%element, %in_port, len = frame.len(), "non-IPv4 packet discarded");
                    return Ok(None);
                };
                let payload = buffer_id.map_or(PacketPayload::Raw(frame), PacketPayload::Buffered);
                self.on_packet(ctx, payload).map(Some)
            }
            ElementEvent::QueueConfig {
                element,
                port,
                queues,
            } => {
                debug!(%element, %port, ?queues, "queue configuration reported");
                self.inner.queues.record_queues(element, port, queues);
                Ok(None)
            }
        }
    }

    fn on_connected(&self, element: ElementId) -> Result<(), CoreError> {
        let name = self.registry().element_name(element).map(str::to_owned);
        if name.is_none() {
            warn!(%element, "element is not declared in the scenario");
        }
        self.inner.elements.begin_connect(element, name);

        if let Err(e) = self.handshake(element) {
            warn!(%element, error = %e, "connect handshake failed");
            self.on_disconnected(element);
            return Err(e);
        }

        if let Some(el) = self.inner.elements.mark_connected(element) {
            info!(element = %el.label(), connections = el.connections, "element connected");
        }
        Ok(())
    }

    /// Queue requests for every declared port, then the baseline.
    fn handshake(&self, element: ElementId) -> Result<(), CoreError> {
        for port in self.registry().declared_ports(element) {
            self.inner
                .dispatcher
                .send(element, ElementCommand::RequestQueueConfig { port })?;
        }
        self.inner.synchronizer.install_baseline(element)?;
        Ok(())
    }

    fn on_disconnected(&self, element: ElementId) {
        if let Some(el) = self.inner.elements.disconnect(element) {
            info!(element = %el.label(), "element disconnected");
        }
        self.inner.queues.forget_element(element);
    }

    fn on_packet(
        &self,
        ctx: PacketContext,
        payload: PacketPayload,
    ) -> Result<Decision, CoreError> {
        let element = ctx.element;
        let in_port = ctx.in_port;
        let _gate = self.inner.flow_gate.read();
        let active = self.inner.active.snapshot();
        let mut decision = self.inner.engine.decide(ctx, &active, &self.inner.queues);

        let counters = &self.inner.counters;
        counters.decisions.fetch_add(1, Ordering::Relaxed);

        if let Some(rule) = &decision.rule {
            let actions = rule.actions.clone();
            if self
                .inner
                .dispatcher
                .send(element, ElementCommand::InstallRule(rule.clone()))?
            {
                counters.forwarded.fetch_add(1, Ordering::Relaxed);
                decision.replayed = self.inner.dispatcher.send(
                    element,
                    ElementCommand::ReplayPacket {
                        in_port,
                        payload,
                        actions,
                    },
                )?;
            }
        }
        Ok(decision)
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Resolve against the current active set.
    pub fn resolve(
        &self,
        element: ElementId,
        source: &HostAddress,
        destination: &HostAddress,
    ) -> Vec<PortNo> {
        self.inner
            .engine
            .resolve(element, source, destination, &self.inner.active.snapshot())
    }

    pub fn active_slices(&self) -> Arc<ActiveSlices> {
        self.inner.active.snapshot()
    }

    pub fn subscribe_active_slices(&self) -> SnapshotStream<ActiveSlices> {
        SnapshotStream::new(self.inner.active.subscribe())
    }

    pub fn elements_snapshot(&self) -> Arc<Vec<Arc<Element>>> {
        self.inner.elements.snapshot()
    }

    pub fn subscribe_elements(&self) -> SnapshotStream<Vec<Arc<Element>>> {
        SnapshotStream::new(self.inner.elements.subscribe())
    }

    pub fn element(&self, id: ElementId) -> Option<Arc<Element>> {
        self.inner.elements.get(id)
    }

    pub fn stats(&self) -> ControllerStats {
        let c = &self.inner.counters;
        ControllerStats {
            decisions: c.decisions.load(Ordering::Relaxed),
            forwarded: c.forwarded.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            resyncs: c.resyncs.load(Ordering::Relaxed),
        }
    }

    /// Report of the most recent resync, if any has run.
    pub fn last_resync(&self) -> Option<Arc<ResyncReport>> {
        self.inner.last_resync.load_full()
    }

    fn record_resync(&self, report: &ResyncReport) {
        self.inner.counters.resyncs.fetch_add(1, Ordering::Relaxed);
        self.inner.last_resync.store(Some(Arc::new(report.clone())));
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply commands one at a time, in arrival order.
async fn command_processor_task(controller: Controller, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command);
                let _ = envelope.response_tx.send(result);
            }
        }
    }

    rx.close();
    while let Ok(envelope) = rx.try_recv() {
        let _ = envelope.response_tx.send(Err(CoreError::ControllerStopped));
    }
}

// ── Command routing ──────────────────────────────────────────────

fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let inner = &controller.inner;

    match cmd {
        Command::ToggleSlice { slice } => {
            if !controller.registry().contains_slice(&slice) {
                return Err(CoreError::SliceNotFound {
                    name: slice.to_string(),
                });
            }
            let _gate = inner.flow_gate.write();
            let active = inner.active.toggle(&slice);
            info!(
                %slice,
                enabled = active.contains(&slice),
                active = ?active.names(),
                "slice toggled"
            );
            let report = inner.synchronizer.resync();
            controller.record_resync(&report);
            Ok(CommandResult::Toggled { active, report })
        }
        Command::Resync => {
            let _gate = inner.flow_gate.write();
            let report = inner.synchronizer.resync();
            controller.record_resync(&report);
            Ok(CommandResult::Resynced(report))
        }
    }
}

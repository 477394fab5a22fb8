//! Scan flow controller
//!
//! Runs one [`FlowMachine`] for the lifetime of a screen mount on a dedicated
//! tokio task. Inputs arrive on two channels, presentation commands and
//! internal completions (permission answer, lookup results, timer firings),
//! and are applied strictly one at a time. Background work never touches
//! the machine directly; it posts a completion tagged with its session id.
//!
//! The presentation layer talks to the controller through a [`ScanHandle`]:
//! commands go in, [`FlowSnapshot`]s come out of a watch channel, and richer
//! notifications go out on the [`EventBus`].

use crate::error::FlowClosed;
use crate::flow::machine::{FlowEffect, FlowInput, FlowMachine, FlowSnapshot, ModeTransition};
use crate::models::{DecodeEvent, LookupResult};
use crate::services::{resolve_capability, CameraCapability, ProductLookup, ResetScheduler};
use chrono::Utc;
use nutriscan_common::config::ScannerSettings;
use nutriscan_common::events::{CapabilityState, EventBus, FlowMode, NoticeLevel, ScanEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Controller tuning
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Delay before a shown result returns to scanning
    pub reset_delay: Duration,
    /// Pending presentation commands before decode events are dropped
    pub command_buffer: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::from_settings(&ScannerSettings::default())
    }
}

impl FlowConfig {
    pub fn from_settings(settings: &ScannerSettings) -> Self {
        Self {
            reset_delay: settings.reset_delay(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

/// Presentation-side commands
#[derive(Debug)]
enum Command {
    StartScan,
    Decoded(DecodeEvent),
    ScanAnother,
    BackToMenu,
    Leave,
}

impl From<Command> for FlowInput {
    fn from(command: Command) -> Self {
        match command {
            Command::StartScan => FlowInput::StartScan,
            Command::Decoded(event) => FlowInput::Decoded(event),
            Command::ScanAnother => FlowInput::ScanAnother,
            Command::BackToMenu => FlowInput::BackToMenu,
            Command::Leave => FlowInput::Leave,
        }
    }
}

/// Presentation-side handle to a running scan flow
///
/// Dropping every handle is equivalent to [`ScanHandle::leave`].
#[derive(Debug)]
pub struct ScanHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<FlowSnapshot>,
    task: JoinHandle<()>,
}

impl ScanHandle {
    /// "Scan a product"
    pub async fn start_scan(&self) -> Result<(), FlowClosed> {
        self.send(Command::StartScan).await
    }

    /// "Scan another product" (manual reset)
    pub async fn scan_another(&self) -> Result<(), FlowClosed> {
        self.send(Command::ScanAnother).await
    }

    /// "Back to menu"
    pub async fn back_to_menu(&self) -> Result<(), FlowClosed> {
        self.send(Command::BackToMenu).await
    }

    /// Feed one camera decode event
    ///
    /// Never waits: when the command buffer is full the event is dropped,
    /// which is harmless because at most one event per session is used.
    pub fn decoded(&self, symbol_value: impl Into<String>) -> Result<(), FlowClosed> {
        match self
            .commands
            .try_send(Command::Decoded(DecodeEvent::new(symbol_value)))
        {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Command buffer full, decode event dropped");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(FlowClosed),
        }
    }

    /// Tear the screen down and wait for the controller to finish
    ///
    /// Cancels the auto-reset timer and any in-flight lookup.
    pub async fn leave(self) -> FlowSnapshot {
        let _ = self.commands.send(Command::Leave).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Flow controller task failed");
        }
        self.snapshots.borrow().clone()
    }

    /// Current presentation state
    pub fn snapshot(&self) -> FlowSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver for presentation state changes
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until the presentation state satisfies `predicate`
    pub async fn wait_for<F>(&self, predicate: F) -> Result<FlowSnapshot, FlowClosed>
    where
        F: FnMut(&FlowSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(predicate).await.map_err(|_| FlowClosed)?;
        Ok(snapshot.clone())
    }

    /// Wait until the flow reaches `mode`
    pub async fn wait_for_mode(&self, mode: FlowMode) -> Result<FlowSnapshot, FlowClosed> {
        self.wait_for(|s| s.mode == mode).await
    }

    async fn send(&self, command: Command) -> Result<(), FlowClosed> {
        self.commands.send(command).await.map_err(|_| FlowClosed)
    }
}

/// Mount a scan flow
///
/// Issues the mount's single camera permission request and starts the
/// controller task. Must be called from within a tokio runtime.
pub fn spawn_flow(
    config: FlowConfig,
    lookup: Arc<dyn ProductLookup>,
    camera: Arc<dyn CameraCapability>,
    event_bus: EventBus,
) -> ScanHandle {
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();

    let machine = FlowMachine::new();
    let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

    let permission_tx = completion_tx.clone();
    let permission_task = tokio::spawn(async move {
        let state = resolve_capability(camera.as_ref()).await;
        let _ = permission_tx.send(FlowInput::CapabilityResolved(state));
    });

    let controller = FlowController {
        machine,
        config,
        lookup,
        event_bus,
        completion_tx,
        snapshot_tx,
        scheduler: ResetScheduler::new(),
        in_flight: None,
        permission_task: Some(permission_task),
    };

    let task = tokio::spawn(controller.run(command_rx, completion_rx));

    ScanHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        task,
    }
}

struct InFlightLookup {
    session_id: Uuid,
    task: JoinHandle<()>,
}

struct FlowController {
    machine: FlowMachine,
    config: FlowConfig,
    lookup: Arc<dyn ProductLookup>,
    event_bus: EventBus,
    completion_tx: mpsc::UnboundedSender<FlowInput>,
    snapshot_tx: watch::Sender<FlowSnapshot>,
    scheduler: ResetScheduler,
    in_flight: Option<InFlightLookup>,
    permission_task: Option<JoinHandle<()>>,
}

impl FlowController {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<FlowInput>,
    ) {
        tracing::info!("Scan flow mounted");

        loop {
            let input = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => FlowInput::from(command),
                    None => {
                        tracing::debug!("All scan handles dropped");
                        FlowInput::Leave
                    }
                },
                Some(input) = completions.recv() => input,
            };

            let leaving = matches!(input, FlowInput::Leave);
            self.apply(input);
            if leaving {
                break;
            }
        }

        self.teardown();
        tracing::info!("Scan flow unmounted");
    }

    fn apply(&mut self, input: FlowInput) {
        match &input {
            FlowInput::AutoReset { session_id } => self.scheduler.clear(*session_id),
            FlowInput::LookupCompleted { session_id, .. } => {
                if self.in_flight.as_ref().map(|l| l.session_id) == Some(*session_id) {
                    self.in_flight = None;
                }
            }
            _ => {}
        }

        let resolved_capability = match &input {
            FlowInput::CapabilityResolved(state) => Some(*state),
            _ => None,
        };

        let step = self.machine.handle(input);

        if let Some(rejection) = step.rejection {
            tracing::debug!(?rejection, mode = %self.machine.mode(), "Flow input ignored");
            return;
        }

        if let Some(state) = resolved_capability {
            self.announce_capability(state);
        }
        if let Some(transition) = &step.transition {
            self.announce_transition(transition);
        }
        for effect in step.effects {
            self.run_effect(effect);
        }

        self.snapshot_tx.send_replace(self.machine.snapshot());
    }

    fn run_effect(&mut self, effect: FlowEffect) {
        match effect {
            FlowEffect::StartLookup {
                session_id,
                barcode,
            } => {
                tracing::info!(session_id = %session_id, barcode = %barcode, "Scan accepted, looking up product");
                self.event_bus.emit_lossy(ScanEvent::ScanAccepted {
                    session_id,
                    barcode: barcode.clone(),
                    timestamp: Utc::now(),
                });

                let lookup = Arc::clone(&self.lookup);
                let tx = self.completion_tx.clone();
                let task = tokio::spawn(async move {
                    let result = lookup.resolve(&barcode).await;
                    let _ = tx.send(FlowInput::LookupCompleted { session_id, result });
                });
                self.in_flight = Some(InFlightLookup { session_id, task });
            }
            FlowEffect::ScheduleReset { session_id } => {
                self.scheduler.schedule(
                    session_id,
                    self.config.reset_delay,
                    self.completion_tx.clone(),
                    FlowInput::AutoReset { session_id },
                );
            }
            FlowEffect::CancelReset => {
                self.scheduler.cancel();
            }
            FlowEffect::AbandonLookup => self.abandon_lookup(),
        }
    }

    fn abandon_lookup(&mut self) {
        if let Some(lookup) = self.in_flight.take() {
            tracing::debug!(session_id = %lookup.session_id, "Abandoning in-flight lookup");
            lookup.task.abort();
        }
    }

    fn announce_capability(&self, state: CapabilityState) {
        self.event_bus.emit_lossy(ScanEvent::CapabilityResolved {
            state,
            timestamp: Utc::now(),
        });

        if state == CapabilityState::Denied {
            self.event_bus.emit_lossy(ScanEvent::notice(
                NoticeLevel::Error,
                "No access to camera",
                Some("Please enable camera permission in settings.".to_string()),
            ));
        }
    }

    fn announce_transition(&self, transition: &ModeTransition) {
        tracing::info!(
            session_id = ?transition.session_id,
            old_mode = %transition.old_mode,
            new_mode = %transition.new_mode,
            "Flow mode changed"
        );

        self.event_bus.emit_lossy(ScanEvent::ModeChanged {
            session_id: transition.session_id,
            old_mode: transition.old_mode,
            new_mode: transition.new_mode,
            timestamp: transition.transitioned_at,
        });

        if transition.new_mode == FlowMode::Result {
            if let (Some(session_id), Some(result)) =
                (transition.session_id, self.machine.last_result())
            {
                self.announce_result(session_id, result);
            }
        }
    }

    fn announce_result(&self, session_id: Uuid, result: &LookupResult) {
        let barcode = self
            .machine
            .session()
            .and_then(|s| s.barcode())
            .unwrap_or_default()
            .to_string();

        self.event_bus.emit_lossy(ScanEvent::LookupCompleted {
            session_id,
            barcode,
            outcome: result.outcome(),
            message: result.message(),
            timestamp: Utc::now(),
        });

        let notice = match result {
            LookupResult::Found(_) => ScanEvent::notice(NoticeLevel::Success, result.title(), None),
            _ => ScanEvent::notice(NoticeLevel::Error, result.title(), Some(result.message())),
        };
        self.event_bus.emit_lossy(notice);
    }

    fn teardown(&mut self) {
        if let Some(session_id) = self.scheduler.cancel() {
            tracing::debug!(session_id = %session_id, "Auto-reset cancelled on unmount");
        }
        self.abandon_lookup();
        if let Some(task) = self.permission_task.take() {
            task.abort();
        }
        self.snapshot_tx.send_replace(self.machine.snapshot());
    }
}

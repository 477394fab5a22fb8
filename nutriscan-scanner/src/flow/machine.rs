//! Scan flow state machine
//!
//! Pure, synchronous core of the scanner screen. It owns the [`FlowMode`], the
//! current [`ScanSession`] and the last [`LookupResult`]; it performs no I/O.
//! Each input produces a [`Step`]: at most one mode transition plus the
//! effects the controller must carry out (start a lookup, start or stop the
//! auto-reset timer).
//!
//! ```text
//!            StartScan (granted)         accepted decode
//!   Menu ─────────────────────▶ Scanning ───────────────▶ Processing
//!    ▲  ◀──── BackToMenu ──────    ▲                          │
//!    │                             │ ScanAnother / AutoReset  │ LookupCompleted
//!    └──────── BackToMenu ──────── Result ◀───────────────────┘
//!
//!   Leave: any mode → Menu
//! ```
//!
//! Completions (lookup results, timer firings) carry the session id they were
//! started for. A completion whose session is no longer current is rejected
//! as stale and changes nothing.

use crate::models::{Admission, DecodeEvent, LookupResult, ScanSession};
use chrono::{DateTime, Utc};
use nutriscan_common::events::{CapabilityState, FlowMode};
use serde::Serialize;
use uuid::Uuid;

/// Input to the state machine
#[derive(Debug, Clone)]
pub enum FlowInput {
    /// The mount's permission request resolved
    CapabilityResolved(CapabilityState),
    /// User: "scan a product"
    StartScan,
    /// Camera reported a symbol
    Decoded(DecodeEvent),
    /// Catalog lookup started for `session_id` finished
    LookupCompleted {
        session_id: Uuid,
        result: LookupResult,
    },
    /// User: "scan another product"
    ScanAnother,
    /// Auto-reset timer for `session_id` fired
    AutoReset { session_id: Uuid },
    /// User: "back to menu"
    BackToMenu,
    /// Screen is being torn down
    Leave,
}

/// Work the controller must perform after a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEffect {
    /// Resolve `barcode` and report back with `LookupCompleted`
    StartLookup { session_id: Uuid, barcode: String },
    /// Start the auto-reset timer for the session now showing a result
    ScheduleReset { session_id: Uuid },
    /// Stop the pending auto-reset timer
    CancelReset,
    /// The in-flight lookup no longer matters
    AbandonLookup,
}

/// Why an input had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Capability is resolved once per mount
    CapabilityAlreadyResolved,
    /// Scanning requires granted camera access
    CapabilityNotGranted(CapabilityState),
    /// Input is not meaningful in the current mode
    InvalidInMode(FlowMode),
    /// Session latch already admitted a decode event
    DuplicateScan,
    /// Decode event carried no text
    EmptySymbol,
    /// Completion belongs to a session that has ended
    StaleSession,
}

/// Record of one mode change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeTransition {
    /// Session current after the change (`None` at the menu)
    pub session_id: Option<Uuid>,
    pub old_mode: FlowMode,
    pub new_mode: FlowMode,
    pub transitioned_at: DateTime<Utc>,
}

/// Result of handling one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub transition: Option<ModeTransition>,
    pub effects: Vec<FlowEffect>,
    pub rejection: Option<Rejection>,
}

impl Step {
    fn rejected(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Default::default()
        }
    }
}

/// State exposed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub mode: FlowMode,
    pub capability: CapabilityState,
    /// Lookup in flight
    pub loading: bool,
    pub last_result: Option<LookupResult>,
    /// Barcode admitted by the current session
    pub barcode: Option<String>,
    pub session_id: Option<Uuid>,
    /// Camera is held only while scanning
    pub camera_active: bool,
}

impl FlowSnapshot {
    /// Whether "scan a product" should be offered
    pub fn can_start_scan(&self) -> bool {
        self.mode == FlowMode::Menu && self.capability == CapabilityState::Granted
    }
}

/// The scan flow state machine
#[derive(Debug, Default)]
pub struct FlowMachine {
    mode: FlowMode,
    capability: CapabilityState,
    session: Option<ScanSession>,
    last_result: Option<LookupResult>,
}

impl FlowMachine {
    /// New machine at the menu with unknown capability
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FlowMode {
        self.mode
    }

    pub fn capability(&self) -> CapabilityState {
        self.capability
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    pub fn last_result(&self) -> Option<&LookupResult> {
        self.last_result.as_ref()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            mode: self.mode,
            capability: self.capability,
            loading: self.mode == FlowMode::Processing,
            last_result: self.last_result.clone(),
            barcode: self.session.as_ref().and_then(|s| s.barcode().map(str::to_string)),
            session_id: self.current_session_id(),
            camera_active: self.mode == FlowMode::Scanning,
        }
    }

    fn current_session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.session_id)
    }

    /// Apply one input
    pub fn handle(&mut self, input: FlowInput) -> Step {
        match input {
            FlowInput::CapabilityResolved(state) => self.on_capability_resolved(state),
            FlowInput::StartScan => self.on_start_scan(),
            FlowInput::Decoded(event) => self.on_decoded(&event),
            FlowInput::LookupCompleted { session_id, result } => {
                self.on_lookup_completed(session_id, result)
            }
            FlowInput::ScanAnother => self.on_scan_another(),
            FlowInput::AutoReset { session_id } => self.on_auto_reset(session_id),
            FlowInput::BackToMenu => self.on_back_to_menu(),
            FlowInput::Leave => self.on_leave(),
        }
    }

    fn on_capability_resolved(&mut self, state: CapabilityState) -> Step {
        if self.capability != CapabilityState::Unknown {
            return Step::rejected(Rejection::CapabilityAlreadyResolved);
        }
        self.capability = state;
        Step::default()
    }

    fn on_start_scan(&mut self) -> Step {
        if self.mode != FlowMode::Menu {
            return Step::rejected(Rejection::InvalidInMode(self.mode));
        }
        if self.capability != CapabilityState::Granted {
            return Step::rejected(Rejection::CapabilityNotGranted(self.capability));
        }

        Step {
            transition: Some(self.arm_session()),
            ..Default::default()
        }
    }

    fn on_decoded(&mut self, event: &DecodeEvent) -> Step {
        // The camera may still deliver frames while a lookup runs; those reach
        // the latch and are discarded there.
        let session = match (self.mode, self.session.as_mut()) {
            (FlowMode::Scanning | FlowMode::Processing, Some(session)) => session,
            (mode, _) => return Step::rejected(Rejection::InvalidInMode(mode)),
        };

        match session.offer(event) {
            Admission::Accepted(barcode) => {
                let session_id = session.session_id;
                Step {
                    transition: Some(self.transition_to(FlowMode::Processing)),
                    effects: vec![FlowEffect::StartLookup { session_id, barcode }],
                    rejection: None,
                }
            }
            Admission::Duplicate => Step::rejected(Rejection::DuplicateScan),
            Admission::EmptySymbol => Step::rejected(Rejection::EmptySymbol),
        }
    }

    fn on_lookup_completed(&mut self, session_id: Uuid, result: LookupResult) -> Step {
        if self.mode != FlowMode::Processing || self.current_session_id() != Some(session_id) {
            return Step::rejected(Rejection::StaleSession);
        }

        self.last_result = Some(result);
        Step {
            transition: Some(self.transition_to(FlowMode::Result)),
            effects: vec![FlowEffect::ScheduleReset { session_id }],
            rejection: None,
        }
    }

    fn on_scan_another(&mut self) -> Step {
        if self.mode != FlowMode::Result {
            return Step::rejected(Rejection::InvalidInMode(self.mode));
        }

        Step {
            transition: Some(self.arm_session()),
            effects: vec![FlowEffect::CancelReset],
            rejection: None,
        }
    }

    fn on_auto_reset(&mut self, session_id: Uuid) -> Step {
        if self.mode != FlowMode::Result || self.current_session_id() != Some(session_id) {
            return Step::rejected(Rejection::StaleSession);
        }

        Step {
            transition: Some(self.arm_session()),
            ..Default::default()
        }
    }

    fn on_back_to_menu(&mut self) -> Step {
        let effects = match self.mode {
            FlowMode::Result => vec![FlowEffect::CancelReset],
            FlowMode::Scanning => Vec::new(),
            mode => return Step::rejected(Rejection::InvalidInMode(mode)),
        };

        self.session = None;
        self.last_result = None;
        Step {
            transition: Some(self.transition_to(FlowMode::Menu)),
            effects,
            rejection: None,
        }
    }

    fn on_leave(&mut self) -> Step {
        let effects = match self.mode {
            FlowMode::Processing => vec![FlowEffect::AbandonLookup],
            FlowMode::Result => vec![FlowEffect::CancelReset],
            FlowMode::Menu | FlowMode::Scanning => Vec::new(),
        };

        self.session = None;
        self.last_result = None;
        let transition = (self.mode != FlowMode::Menu).then(|| self.transition_to(FlowMode::Menu));

        Step {
            transition,
            effects,
            rejection: None,
        }
    }

    /// Start a fresh session with an open latch and enter `Scanning`
    fn arm_session(&mut self) -> ModeTransition {
        self.session = Some(ScanSession::arm());
        self.last_result = None;
        self.transition_to(FlowMode::Scanning)
    }

    fn transition_to(&mut self, new_mode: FlowMode) -> ModeTransition {
        let transition = ModeTransition {
            session_id: self.current_session_id(),
            old_mode: self.mode,
            new_mode,
            transitioned_at: Utc::now(),
        };
        self.mode = new_mode;
        transition
    }
}

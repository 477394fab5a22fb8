//! Event types for the NutriScan event system
//!
//! Provides the scan flow event definitions and the EventBus that carries them
//! from the flow controller to logging, notifications and any UI bridge.

mod flow_types;

pub use flow_types::{CapabilityState, FlowMode, LookupOutcome, NoticeLevel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Scan flow event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// The one permission request of a mount resolved
    CapabilityResolved {
        state: CapabilityState,
        timestamp: DateTime<Utc>,
    },

    /// Flow mode changed
    ///
    /// `session_id` is the scan session that is current after the change,
    /// `None` when the machine is back at the menu.
    ModeChanged {
        session_id: Option<Uuid>,
        old_mode: FlowMode,
        new_mode: FlowMode,
        timestamp: DateTime<Utc>,
    },

    /// A decode event was admitted by the session latch
    ///
    /// Emitted at most once per scan session.
    ScanAccepted {
        session_id: Uuid,
        barcode: String,
        timestamp: DateTime<Utc>,
    },

    /// Catalog lookup for a session resolved and was applied
    LookupCompleted {
        session_id: Uuid,
        barcode: String,
        outcome: LookupOutcome,
        /// User-displayable message (never empty)
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Short-lived user feedback (toast)
    Notice {
        level: NoticeLevel,
        title: String,
        detail: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A new product was accepted by the catalog service
    ProductSubmitted {
        barcode: String,
        product_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// Build a notice event stamped with the current time
    pub fn notice(level: NoticeLevel, title: impl Into<String>, detail: Option<String>) -> Self {
        ScanEvent::Notice {
            level,
            title: title.into(),
            detail,
            timestamp: Utc::now(),
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a tokio broadcast channel. Cloning is cheap and every
/// clone emits into the same channel.
///
/// # Examples
///
/// ```
/// use nutriscan_common::events::{EventBus, NoticeLevel, ScanEvent};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ScanEvent::notice(NoticeLevel::Info, "Uploading...", None));
/// assert!(matches!(rx.try_recv(), Ok(ScanEvent::Notice { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScanEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: ScanEvent) -> Result<usize, broadcast::error::SendError<ScanEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ScanEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Scan session and its one-shot debounce latch
//!
//! A camera reports the same physical barcode many times within a few
//! milliseconds. Each armed scanning attempt is a [`ScanSession`] whose latch
//! admits exactly one decode event; everything after it is discarded until a
//! new session is armed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw signal from the camera: a symbol was recognized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeEvent {
    /// Decoded text of the symbol
    pub symbol_value: String,
}

impl DecodeEvent {
    pub fn new(symbol_value: impl Into<String>) -> Self {
        Self {
            symbol_value: symbol_value.into(),
        }
    }
}

/// Verdict of the session latch for one decode event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First usable event of the session; carries the barcode
    Accepted(String),
    /// Latch already closed for this session
    Duplicate,
    /// Event carried no text; the latch stays open
    EmptySymbol,
}

/// One armed scanning attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    /// Unique session identifier, used to recognize stale completions
    pub session_id: Uuid,

    /// Whether a decode event has been admitted
    accepted: bool,

    /// Barcode captured by the admitted event
    barcode: Option<String>,

    /// When the scanner was armed
    pub started_at: DateTime<Utc>,
}

impl ScanSession {
    /// Arm a fresh session with an open latch
    pub fn arm() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            accepted: false,
            barcode: None,
            started_at: Utc::now(),
        }
    }

    /// Offer a decode event to the latch
    ///
    /// Closing the latch and capturing the barcode happen in the same call,
    /// so there is no window where a second event could also be admitted.
    pub fn offer(&mut self, event: &DecodeEvent) -> Admission {
        if self.accepted {
            return Admission::Duplicate;
        }
        if event.symbol_value.is_empty() {
            return Admission::EmptySymbol;
        }

        self.accepted = true;
        self.barcode = Some(event.symbol_value.clone());
        Admission::Accepted(event.symbol_value.clone())
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_accepted_rest_discarded() {
        let mut session = ScanSession::arm();
        let event = DecodeEvent::new("0123456789012");

        assert_eq!(session.offer(&event), Admission::Accepted("0123456789012".to_string()));
        for _ in 0..25 {
            assert_eq!(session.offer(&event), Admission::Duplicate);
        }
        assert!(session.is_accepted());
        assert_eq!(session.barcode(), Some("0123456789012"));
    }

    #[test]
    fn test_different_barcode_after_accept_is_still_duplicate() {
        let mut session = ScanSession::arm();
        session.offer(&DecodeEvent::new("111"));

        assert_eq!(session.offer(&DecodeEvent::new("222")), Admission::Duplicate);
        assert_eq!(session.barcode(), Some("111"));
    }

    #[test]
    fn test_empty_symbol_keeps_latch_open() {
        let mut session = ScanSession::arm();

        assert_eq!(session.offer(&DecodeEvent::new("")), Admission::EmptySymbol);
        assert!(!session.is_accepted());
        assert_eq!(session.offer(&DecodeEvent::new("42")), Admission::Accepted("42".to_string()));
    }

    #[test]
    fn test_new_session_has_open_latch() {
        let mut first = ScanSession::arm();
        first.offer(&DecodeEvent::new("42"));

        let mut second = ScanSession::arm();
        assert_ne!(first.session_id, second.session_id);
        assert!(!second.is_accepted());
        assert_eq!(second.offer(&DecodeEvent::new("42")), Admission::Accepted("42".to_string()));
    }
}

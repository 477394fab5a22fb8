//! Scan flow type definitions
//!
//! Supporting types shared between the flow state machine, its events and
//! whatever renders them.

use serde::{Deserialize, Serialize};

/// Screen mode owned by the flow state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowMode {
    /// Idle menu, camera not held
    #[default]
    Menu,
    /// Camera live, waiting for a decode event
    Scanning,
    /// Barcode accepted, catalog lookup in flight
    Processing,
    /// Lookup resolved, result on screen
    Result,
}

impl std::fmt::Display for FlowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowMode::Menu => write!(f, "menu"),
            FlowMode::Scanning => write!(f, "scanning"),
            FlowMode::Processing => write!(f, "processing"),
            FlowMode::Result => write!(f, "result"),
        }
    }
}

/// Camera authorization state
///
/// `Unknown` until the single permission request of a mount resolves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl std::fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityState::Unknown => write!(f, "unknown"),
            CapabilityState::Granted => write!(f, "granted"),
            CapabilityState::Denied => write!(f, "denied"),
        }
    }
}

/// Classification of a finished catalog lookup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    Found,
    NotFound,
    TransportError,
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

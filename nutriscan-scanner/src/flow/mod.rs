//! Scan flow orchestration
//!
//! [`machine`] holds the pure state machine; [`controller`] runs it on a tokio
//! task and carries out its effects.

pub mod controller;
pub mod machine;

pub use controller::{spawn_flow, FlowConfig, ScanHandle};
pub use machine::{
    FlowEffect, FlowInput, FlowMachine, FlowSnapshot, ModeTransition, Rejection, Step,
};

//! nutriscan-scanner library interface
//!
//! Scan orchestration for the NutriScan client: camera permission gate,
//! per-session debounce latch, catalog lookup client, flow state machine and
//! auto-reset scheduling. Exposed as a library for the console binary and for
//! integration testing.

pub mod console;
pub mod error;
pub mod flow;
pub mod models;
pub mod services;

pub use crate::error::{CatalogError, CatalogResult, FlowClosed};
pub use crate::flow::{spawn_flow, FlowConfig, FlowSnapshot, ScanHandle};

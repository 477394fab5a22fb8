//! # NutriScan Common Library
//!
//! Shared code for the NutriScan scanner and its tooling:
//! - Error types
//! - Bootstrap configuration loading (TOML, environment, CLI priority)
//! - Scan flow event types and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};

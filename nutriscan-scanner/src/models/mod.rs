//! Data models for the scan flow

pub mod product;
pub mod scan_session;

pub use product::{LookupResult, ProductRecord};
pub use scan_session::{Admission, DecodeEvent, ScanSession};

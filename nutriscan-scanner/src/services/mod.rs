//! Services used by the scan flow controller

pub mod capability_gate;
pub mod catalog_client;
pub mod reset_scheduler;

pub use capability_gate::{
    resolve_capability, CameraCapability, PermissionRequestError, PermissionStatus, PresetCamera,
};
pub use catalog_client::{
    CatalogClient, ProductImage, ProductLookup, ProductSubmission, SubmissionReceipt,
};
pub use reset_scheduler::ResetScheduler;

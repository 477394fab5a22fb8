//! Camera authorization gate
//!
//! One permission request per screen mount. Whatever the host answers, the
//! result is final for that mount: a denial is not retried, and a failed
//! request counts as a denial.

use async_trait::async_trait;
use nutriscan_common::events::CapabilityState;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Failure while asking the host for camera access
#[derive(Debug, Error)]
#[error("Camera permission request failed: {0}")]
pub struct PermissionRequestError(pub String);

/// Host permission answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Host camera capability
#[async_trait]
pub trait CameraCapability: Send + Sync {
    /// Ask the host for camera access
    async fn request_access(&self) -> Result<PermissionStatus, PermissionRequestError>;
}

/// Resolve the capability state for a mount
///
/// Issues exactly one request to `camera`.
pub async fn resolve_capability(camera: &dyn CameraCapability) -> CapabilityState {
    match camera.request_access().await {
        Ok(PermissionStatus::Granted) => {
            tracing::info!("Camera access granted");
            CapabilityState::Granted
        }
        Ok(PermissionStatus::Denied) => {
            tracing::warn!("Camera access denied");
            CapabilityState::Denied
        }
        Err(e) => {
            tracing::warn!(error = %e, "Camera permission request failed, treating as denied");
            CapabilityState::Denied
        }
    }
}

/// Camera whose permission answer is fixed up front
///
/// Used by the console driver, where there is no host permission dialog, and
/// by tests. Counts requests so callers can verify the one-request rule.
#[derive(Debug)]
pub struct PresetCamera {
    answer: Result<PermissionStatus, String>,
    requests: AtomicUsize,
}

impl PresetCamera {
    pub fn granted() -> Self {
        Self::with_answer(Ok(PermissionStatus::Granted))
    }

    pub fn denied() -> Self {
        Self::with_answer(Ok(PermissionStatus::Denied))
    }

    /// Camera whose permission request fails outright
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_answer(Err(reason.into()))
    }

    fn with_answer(answer: Result<PermissionStatus, String>) -> Self {
        Self {
            answer,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of permission requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraCapability for PresetCamera {
    async fn request_access(&self) -> Result<PermissionStatus, PermissionRequestError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(PermissionRequestError)
    }
}

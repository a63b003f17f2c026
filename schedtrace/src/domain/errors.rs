//! Structured error types for schedtrace
//!
//! Using thiserror for automatic Display implementation and error chaining.

use crate::host::RegistryError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the capture controller and swap coordinator.
///
/// The producer path never returns these: any internal failure there degrades
/// to dropping the event in flight.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("host refused hook registration: {0}")]
    Registration(#[from] RegistryError),

    #[error("handoff primitive unavailable: {0}")]
    Resource(String),

    #[error("timed out after {0:?} waiting for a buffer handoff")]
    Timeout(Duration),

    #[error("capture is not enabled")]
    NotEnabled,

    #[error("snapshot count {count} outside [0, {capacity}]")]
    InvalidParameter { count: u64, capacity: u64 },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to serialize trace data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_error_display() {
        let err = CaptureError::Registration(RegistryError::TooManyRegistrations);
        assert!(err.to_string().contains("host refused hook registration"));
    }

    #[test]
    fn invalid_parameter_names_bounds() {
        let err = CaptureError::InvalidParameter { count: 9999, capacity: 1024 };
        assert_eq!(err.to_string(), "snapshot count 9999 outside [0, 1024]");
    }
}

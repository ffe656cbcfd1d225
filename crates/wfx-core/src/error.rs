//! Error handling for the WFX engine
//!
//! One error type is shared by every crate in the workspace. Per-event and
//! per-window conditions (unmapped labels, degenerate windows, missing
//! baselines, empty feature masks) are not errors and never reach this type.

use thiserror::Error;

/// Result type alias for WFX operations
pub type WfxResult<T> = Result<T, WfxError>;

/// Error type for all WFX operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WfxError {
    /// Configuration failed validation. Fatal for the whole run.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },

    /// A unit's recording does not exist or could not be opened
    #[error("Recording for unit '{unit}' not found at {path}: {reason}")]
    MissingRecording {
        /// Unit identifier
        unit: String,
        /// Where the recording was expected
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// A recording was loaded but its contents are inconsistent
    #[error("Invalid recording: {reason}")]
    InvalidRecording {
        /// Description of the inconsistency
        reason: String,
    },

    /// A partial or final artifact could not be read or written
    #[error("Artifact error at {path}: {reason}")]
    Artifact {
        /// Artifact location
        path: String,
        /// Description of the failure
        reason: String,
    },

    /// Numerical routine failed (e.g. FFT length mismatch)
    #[error("Computation error: {reason}")]
    Computation {
        /// Description of the failure
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {reason}")]
    Serialization {
        /// Serialization error description
        reason: String,
    },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WfxError {
    /// True for errors that skip a unit rather than fail it
    pub fn is_missing_recording(&self) -> bool {
        matches!(self, WfxError::MissingRecording { .. })
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::WfxError::InvalidConfig {
            message: format!($($arg)+),
        }
    };
}

/// Convenience macro for creating recording errors
#[macro_export]
macro_rules! recording_error {
    ($($arg:tt)+) => {
        $crate::error::WfxError::InvalidRecording {
            reason: format!($($arg)+),
        }
    };
}

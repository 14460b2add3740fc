//! Error types for the fairround round/verification core
//!
//! Every failure here is local and recoverable by resetting the session. Nothing in
//! this crate produces user-facing text; presentation layers map these values.

use thiserror::Error;

/// Root error type for all fairround operations
#[derive(Debug, Error)]
pub enum FairroundError {
    /// Round state machine errors
    #[error("Round error: {0}")]
    Round(#[from] RoundError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Inbound frame decoding errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Filesystem errors from the CLI surfaces
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session driver task is gone
    #[error("Session driver stopped")]
    DriverStopped,
}

/// Round lifecycle errors.
///
/// `InvalidParameters` and `EntropyUnavailable` are returned synchronously from
/// `submit`. The remaining variants describe why an inbound event was dropped or
/// record a server-side failure; they are never raised as hard errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Nonce mismatch: tracking {tracked:?}, event carried {received}")]
    ProtocolMismatch {
        tracked: Option<String>,
        received: String,
    },

    #[error("No round in flight")]
    NoRoundInFlight,

    #[error("Server seed already revealed for nonce {nonce}")]
    SeedAlreadyRevealed { nonce: String },

    #[error("Round {nonce} is closed")]
    RoundClosed { nonce: String },

    #[error("No entropy source available for client seed generation")]
    EntropyUnavailable,

    #[error("Server reported error: {message}")]
    ServerReported {
        nonce: Option<String>,
        message: String,
        code: Option<String>,
    },
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Inbound frame decoding errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Empty frame")]
    Empty,
}

// Convenience type alias for Results
pub type FairroundResult<T> = Result<T, FairroundError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_display() {
        let round_error = RoundError::InvalidParameters("bet amount must be positive".to_string());
        let root: FairroundError = round_error.into();

        assert!(root.to_string().contains("Round error"));
        assert!(root.to_string().contains("bet amount must be positive"));
    }

    #[test]
    fn test_protocol_mismatch_details() {
        let err = RoundError::ProtocolMismatch {
            tracked: Some("41".to_string()),
            received: "42".to_string(),
        };

        assert!(err.to_string().contains("\"41\""));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_source() {
        let config_error = ConfigurationError::LoadFailed("missing".to_string());
        let root = FairroundError::Configuration(config_error);

        assert!(root.source().is_some());
    }
}

//! Error taxonomy for the driver
//!
//! Local failures (dimension, table selection, batch shape, binary resolution,
//! rejected literals) are raised before any engine process is spawned. Everything
//! else is surfaced after a round trip.

use std::time::Duration;

/// Errors returned by every driver operation
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Engine binary missing, not executable, or the process could not be started
    #[error("engine unavailable: {0}")]
    ConnectionFailure(String),

    /// Engine process exceeded the configured bound and was killed
    #[error("command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    /// Process completed but its output could not satisfy the request
    #[error("query failed: {message}")]
    QueryFailure {
        message: String,
        command: Option<String>,
    },

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("vector dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("no table selected; call use_table() or pass a table explicitly")]
    NoTableSelected,

    #[error("batch shape mismatch: {vectors} vectors but {metadata} metadata entries")]
    BatchLengthMismatch { vectors: usize, metadata: usize },
}

impl DriverError {
    pub(crate) fn query(message: impl Into<String>, command: &str) -> Self {
        Self::QueryFailure {
            message: message.into(),
            command: Some(command.to_string()),
        }
    }

    /// Request rejected before rendering; carries no command text
    pub(crate) fn local(message: impl Into<String>) -> Self {
        Self::QueryFailure {
            message: message.into(),
            command: None,
        }
    }

    /// Whether the failure was detected locally, without running the engine
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::NoTableSelected
                | Self::BatchLengthMismatch { .. }
                | Self::ConnectionFailure(_)
                | Self::QueryFailure { command: None, .. }
        )
    }
}

/// Result alias used across the driver API
pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DriverError::DimensionMismatch {
            expected: 4,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "vector dimension mismatch: expected 4, found 3"
        );

        let err = DriverError::TableNotFound("docs".to_string());
        assert_eq!(err.to_string(), "table not found: docs");
    }

    #[test]
    fn test_local_classification() {
        assert!(DriverError::NoTableSelected.is_local());
        assert!(DriverError::ConnectionFailure("missing".into()).is_local());
        assert!(DriverError::local("update requires at least one column").is_local());
        assert!(!DriverError::query("Table 'x' does not exist", "DELETE FROM x").is_local());
        assert!(!DriverError::TableNotFound("docs".into()).is_local());
        assert!(!DriverError::Timeout {
            command: "SHOW TABLES".into(),
            timeout: Duration::from_secs(1),
        }
        .is_local());
    }
}

//! Error types for the rental ingestion crate.

use thiserror::Error;

use crate::window::PageRange;

/// Failures of a single HTTP exchange with an upstream service.
///
/// Every variant except [`TransportError::Malformed`] is transient and may be
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Malformed(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Errors surfaced by the ingestion pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The upstream source reported zero records, or its "no data" code.
    #[error("no data available from the source")]
    NoData,

    /// Every window was attempted but none yielded a matching record.
    #[error("no records collected")]
    NothingCollected,

    /// Total-count probe failed after retries.
    #[error("total count probe failed: {0}")]
    Probe(TransportError),

    /// A single window failed after exhausting its retries.
    #[error("window {range} failed after {attempts} attempts: {cause}")]
    Window {
        range: PageRange,
        attempts: u32,
        cause: TransportError,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to start runtime: {0}")]
    Runtime(String),
}

impl IngestError {
    /// True for the empty-result outcomes a caller renders as an empty state
    /// rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, IngestError::NoData | IngestError::NothingCollected)
    }
}

/// Per-record geocoding failures. These never escape the enricher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("no match for address")]
    NoMatch,

    #[error("invalid coordinate value: {0}")]
    InvalidCoordinate(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_is_not_retryable() {
        assert!(!TransportError::Malformed("x".into()).is_retryable());
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::Status(503).is_retryable());
        assert!(TransportError::Api {
            code: "ERROR-500".into(),
            message: "server".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_window_error_message_names_bounds() {
        let err = IngestError::Window {
            range: PageRange::new(101, 200),
            attempts: 3,
            cause: TransportError::Status(500),
        };
        let msg = err.to_string();
        assert!(msg.contains("101-200"));
        assert!(msg.contains("HTTP error: 500"));
    }

    #[test]
    fn test_empty_result_classification() {
        assert!(IngestError::NoData.is_empty_result());
        assert!(IngestError::NothingCollected.is_empty_result());
        assert!(!IngestError::Cancelled.is_empty_result());
    }
}

//! Error types for the search and session stores.
//!
//! Malformed URL parameters never produce errors; they are treated as unset.
//! Transport failures are reported once to the caller of the action that
//! triggered them and leave store state recoverable by retrying.

use thiserror::Error;

/// Failure of a request to the search or session backend
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The backend answered with a non-success status
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// HTTP status of the failed response, if one arrived
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Top-level error of the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Filter key does not name a known facet field
    #[error("unknown facet field: {0}")]
    UnknownFacet(String),

    /// Filter term is empty; it could not be paired with its key in the URL
    #[error("empty filter term for {0}")]
    EmptyTerm(String),

    /// Sort value is not one of `best`, `dateA`, `dateD`
    #[error("unknown sort order: {0}")]
    UnknownSort(String),

    /// Language code is not supported
    #[error("unsupported language: {0}")]
    UnsupportedLang(String),

    /// Invalid engine configuration
    #[error("invalid config: {0}")]
    Config(String),

    /// Backend request failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl EngineError {
    /// The underlying transport failure, if this error wraps one
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            EngineError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_is_preserved() {
        let err: EngineError = TransportError::Status {
            url: "/api/session".to_string(),
            status: 401,
        }
        .into();
        assert_eq!(err.transport().and_then(TransportError::status), Some(401));
        assert_eq!(err.to_string(), "/api/session responded with status 401");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            EngineError::UnknownFacet("foo".to_string()).to_string(),
            "unknown facet field: foo"
        );
    }
}

//! Store-boundary error taxonomy.
//!
//! Failures are classified here, at the adapter boundary; nothing
//! downstream inspects error shapes at runtime.

use serde_json::Value;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by a backing store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing transport answered with a structured failure; status
    /// and body travel to the client unchanged.
    #[error("backing store responded with status {status}")]
    Transport { status: u16, body: Value },

    /// The service-account key material could not be read or parsed.
    #[error("credentials unusable: {0}")]
    Credentials(String),

    /// Anything without a transport shape.
    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    pub fn transport(status: u16, body: Value) -> Self {
        StoreError::Transport { status, body }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        StoreError::Internal(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_keeps_status_and_body() {
        let err = StoreError::transport(403, json!({"error": "forbidden"}));
        match err {
            StoreError::Transport { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, json!({"error": "forbidden"}));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}

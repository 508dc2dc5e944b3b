//! Google Sheets implementation of the store contract.
//!
//! Stands in for the backing row store in production: `load` pulls sheet
//! properties plus the value grid, reads filter in memory, writes go back
//! through the values and batchUpdate endpoints.

mod auth;
mod client;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use client::{SheetsStore, SheetsStoreFactory};

use serde_json::Value;

/// Pull the structured `error` payload out of an API error body, falling
/// back to the body itself when the field is absent.
pub(crate) fn error_payload(body: Value) -> Value {
    if let Some(error) = body.get("error") {
        if error.is_object() {
            return error.clone();
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_payload_extracts_error_object() {
        let body = json!({"error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}});
        assert_eq!(
            error_payload(body),
            json!({"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"})
        );
    }

    #[test]
    fn test_error_payload_keeps_flat_bodies() {
        let body = json!({"error": "invalid_grant", "error_description": "Invalid JWT"});
        assert_eq!(error_payload(body.clone()), body);
    }

    #[test]
    fn test_error_payload_keeps_non_objects() {
        assert_eq!(error_payload(Value::Null), Value::Null);
    }
}

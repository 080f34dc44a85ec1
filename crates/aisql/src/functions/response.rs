//! The value a SQL function hands back to the query engine

use serde_json::{Value, json};

use crate::error::AisqlError;

/// Message returned by a runner that has no completion provider
pub const PROVIDER_UNAVAILABLE: &str =
    "Completion provider not available. Configure an API key for the remote provider.";

/// Outcome of one function call
#[derive(Debug, Clone, PartialEq)]
pub enum UdfResponse {
    /// The result object
    Success(Value),
    /// The call failed; `message` is shown to the SQL caller
    Error { message: String },
}

impl UdfResponse {
    pub fn error(message: impl Into<String>) -> Self {
        UdfResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, UdfResponse::Error { .. })
    }

    /// The JSON value SQL callers consume.
    ///
    /// Errors take the shape `{"error": true, "message": "..."}`.
    pub fn into_value(self) -> Value {
        match self {
            UdfResponse::Success(value) => value,
            UdfResponse::Error { message } => json!({"error": true, "message": message}),
        }
    }

    /// Serialize for the wire, keeping non-ASCII text unescaped
    pub fn to_wire(&self) -> String {
        self.clone().into_value().to_string()
    }
}

impl From<AisqlError> for UdfResponse {
    fn from(e: AisqlError) -> Self {
        UdfResponse::error(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_wire_is_the_object() {
        let response = UdfResponse::Success(json!({"summary": "人工智能"}));
        assert!(!response.is_error());
        assert_eq!(response.to_wire(), r#"{"summary":"人工智能"}"#);
    }

    #[test]
    fn test_error_wire_shape() {
        let response = UdfResponse::error(PROVIDER_UNAVAILABLE);
        assert!(response.is_error());

        let value: Value = serde_json::from_str(&response.to_wire()).unwrap();
        assert_eq!(value["error"], json!(true));
        assert_eq!(value["message"], json!(PROVIDER_UNAVAILABLE));
    }

    #[test]
    fn test_from_aisql_error() {
        let response: UdfResponse =
            AisqlError::InvalidArgument("missing required argument 'text'".to_string()).into();
        assert_eq!(
            response,
            UdfResponse::error("Invalid argument: missing required argument 'text'")
        );
    }
}

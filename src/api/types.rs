//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::platform::FocusChange;
use crate::session::SessionSnapshot;

/// Request to deliver a focus change from the platform side.
#[derive(Debug, Clone, Deserialize)]
pub struct FocusChangeRequest {
    pub change: FocusChange,
}

/// Response for a delivered focus change.
#[derive(Debug, Clone, Serialize)]
pub struct FocusChangeResponse {
    /// Whether a focus holder received the change.
    pub delivered: bool,
    /// Session state after the change was handled.
    pub session: SessionSnapshot,
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "NOT_IMPLEMENTED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_implemented(channel: &str, method: &str) -> Self {
        Self::new(
            "NOT_IMPLEMENTED",
            format!("Method '{}' is not implemented on channel '{}'", method, channel),
        )
    }

    pub fn simulator_disabled() -> Self {
        Self::new(
            "SIMULATOR_DISABLED",
            "Focus changes can only be injected on a simulated platform",
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_change_request() {
        let req: FocusChangeRequest =
            serde_json::from_str(r#"{"change": "loss_transient"}"#).unwrap();
        assert_eq!(req.change, FocusChange::LossTransient);

        assert!(serde_json::from_str::<FocusChangeRequest>(r#"{"change": "mute"}"#).is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let err = ErrorResponse::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("TEST_ERROR"));
        assert!(json.contains("Test message"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_error_response_with_details() {
        let err = ErrorResponse::internal_error("join failed").with_details("thread panicked");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["details"], "thread panicked");
    }

    #[test]
    fn test_not_implemented_message() {
        let err = ErrorResponse::not_implemented("call_audio/device", "ejectDevice");
        assert_eq!(err.code, "NOT_IMPLEMENTED");
        assert!(err.message.contains("ejectDevice"));
        assert!(err.message.contains("call_audio/device"));
    }
}

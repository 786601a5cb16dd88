//! Wire types shared by the manager and worker HTTP surfaces
//!
//! Both nodes speak the same small REST dialect: task events in, task
//! snapshots out, and a single error envelope for every non-2xx response.

use serde::{Deserialize, Serialize};

/// Error envelope returned by every 4xx/5xx response on both nodes.
///
/// The manager also decodes this envelope when a worker rejects a dispatched
/// task event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub http_status_code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(http_status_code: u16, message: impl Into<String>) -> Self {
        Self {
            http_status_code,
            message: message.into(),
        }
    }
}

/// API endpoint paths
pub mod endpoints {
    pub const TASKS: &str = "/tasks";
    pub const STATS: &str = "/stats";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let envelope = ErrorResponse::new(404, "No task found");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["http_status_code"], 404);
        assert_eq!(json["message"], "No task found");
    }

    #[test]
    fn test_error_envelope_round_trip() {
        let envelope = ErrorResponse::new(400, "invalid state transition");
        let json = serde_json::to_string(&envelope).unwrap();
        let decoded: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, envelope);
    }
}

//! Client error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service error code reported when a database uid is unknown.
pub const DB_NOT_EXIST: &str = "db_not_exist";

/// Structured error payload returned by the management API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub description: String,
}

/// Errors returned by API calls, decoded once at the response boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (connect, TLS, IO).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a structured error payload.
    #[error("service error (HTTP {status}): {} {}", .body.error_code, .body.description)]
    Service { status: u16, body: ServiceErrorBody },

    /// The service answered with an error status but no structured payload.
    #[error("unexpected response (HTTP {status}): {body}")]
    Unclassified { status: u16, body: String },

    /// A success response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The client could not be built from its configuration.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Service { status, .. } | ClientError::Unclassified { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Service error code, if the response carried one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ClientError::Service { body, .. } if !body.error_code.is_empty() => {
                Some(body.error_code.as_str())
            }
            _ => None,
        }
    }

    /// Whether the error means the requested database does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404) || self.error_code() == Some(DB_NOT_EXIST)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn service(status: u16, code: &str, description: &str) -> ClientError {
        ClientError::Service {
            status,
            body: ServiceErrorBody {
                error_code: code.to_string(),
                description: description.to_string(),
            },
        }
    }

    #[test]
    fn test_not_found_by_status() {
        let err = ClientError::Unclassified {
            status: 404,
            body: "not here".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn test_not_found_by_code() {
        // Some cluster versions answer unknown uids with 400 + db_not_exist
        let err = service(400, DB_NOT_EXIST, "");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        assert!(!service(409, "db_conflict", "busy").is_not_found());
        assert!(!ClientError::Transport("connection refused".to_string()).is_not_found());
        assert_eq!(ClientError::Decode("eof".to_string()).status(), None);
    }

    #[test]
    fn test_empty_code_is_none() {
        assert_eq!(service(500, "", "boom").error_code(), None);
    }
}

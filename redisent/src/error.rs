//! Reconciler error types and client error normalization.

use std::time::Duration;

use redisent_client::{ClientError, DatabaseStatus};
use thiserror::Error;
use tracing::debug;

use crate::diff::ValidationError;
use crate::schema::Field;

/// Errors surfaced by reconciler operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A remote call failed; `message` is the normalized client error.
    #[error("{context}: {message}")]
    Api { context: String, message: String },

    /// Convergence reached a status outside both the pending and target sets.
    #[error("unexpected state '{status}' for database {uid}, wanted target '{}'", join(.target))]
    UnexpectedState {
        uid: u32,
        status: String,
        target: Vec<DatabaseStatus>,
    },

    /// The pending status outlived the operation timeout.
    #[error(
        "timeout while waiting for database {uid} to become '{}' (last state: '{last_status}', timeout: {timeout:?})",
        join(.target)
    )]
    Timeout {
        uid: u32,
        last_status: String,
        target: Vec<DatabaseStatus>,
        timeout: Duration,
    },

    /// The desired state was rejected at plan time.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The change cannot be applied in place; the database has to be
    /// deleted and recreated.
    #[error("database {uid} cannot be updated in place: changing {field} requires replacement")]
    RequiresReplacement { uid: u32, field: Field },

    /// The operation needs an identity the resource does not have yet.
    #[error("database has no id")]
    MissingId,

    /// The stored identity is not a database uid.
    #[error("invalid database id '{0}'")]
    InvalidId(String),

    /// Another error with operation context attached.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ResourceError>,
    },
}

impl ResourceError {
    /// Normalize a client error and attach operation context.
    pub fn api(context: impl Into<String>, err: &ClientError) -> Self {
        ResourceError::Api {
            context: context.into(),
            message: normalize(err),
        }
    }

    pub fn context(self, context: impl Into<String>) -> Self {
        ResourceError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ResourceError::Timeout { .. } => true,
            ResourceError::Context { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

fn join(statuses: &[DatabaseStatus]) -> String {
    if statuses.is_empty() {
        return "<absent>".to_string();
    }
    statuses
        .iter()
        .map(DatabaseStatus::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse a client error into one human-readable message.
///
/// Structured service errors yield their description, falling back to the
/// error code and then to a generic message. Anything without a structured
/// payload is reported as "unknown error"; the raw error is only logged.
pub fn normalize(err: &ClientError) -> String {
    debug!("unwrapping client error: {:?}", err);

    match err {
        ClientError::Service { body, .. } => {
            if !body.description.is_empty() {
                body.description.clone()
            } else if !body.error_code.is_empty() {
                body.error_code.clone()
            } else {
                "unknown service error".to_string()
            }
        }
        ClientError::Transport(_)
        | ClientError::Unclassified { .. }
        | ClientError::Decode(_)
        | ClientError::Config(_) => "unknown error".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;

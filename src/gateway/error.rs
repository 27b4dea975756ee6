//! Error taxonomy for appliance calls.

use thiserror::Error;

use super::ObjectKind;

/// Errors returned by a [`Gateway`](super::Gateway) implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Create or bind hit an object that is already present.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: ObjectKind, name: String },

    /// The object or binding is absent.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ObjectKind, name: String },

    /// The appliance refused the operation.
    #[error("Appliance rejected request: {status} (code {code}): {message}")]
    Rejected {
        status: u16,
        code: i64,
        message: String,
    },

    /// The appliance could not be reached or did not answer in time.
    #[error("Transport failure calling '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The appliance answered with a body we could not decode.
    #[error("Malformed {kind} response: {message}")]
    Protocol { kind: ObjectKind, message: String },

    /// The configured endpoint cannot be turned into a request URL.
    #[error("Invalid appliance endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, GatewayError::AlreadyExists { .. })
    }

    /// Whether re-running the whole operation can be expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }

    /// Short machine-readable tag for logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::AlreadyExists { .. } => "already_exists",
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::Rejected { .. } => "rejected",
            GatewayError::Transport { .. } => "transport",
            GatewayError::Protocol { .. } => "protocol",
            GatewayError::Endpoint { .. } => "endpoint",
        }
    }
}

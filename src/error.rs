//! Error types for the tango bot.

use crate::flow::ChatState;

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Outbound delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Persistence collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Free-text extraction collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures raised by a flow handler that the dispatcher must recover from
/// by resetting the session.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Handler {handler} has no sub-handler for state {state}")]
    UnexpectedState {
        handler: &'static str,
        state: ChatState,
    },
}

/// Dispatch table defects, detected when the dispatcher is built.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("State {0} is not claimed by any flow handler")]
    Unclaimed(ChatState),

    #[error("State {state} is claimed by both {first} and {second}")]
    Conflict {
        state: ChatState,
        first: &'static str,
        second: &'static str,
    },
}

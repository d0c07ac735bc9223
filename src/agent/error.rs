// src/agent/error.rs
// Error taxonomy for tool dispatch

use thiserror::Error;

/// The one message shown for a task that is missing OR inaccessible.
/// Both cases must stay indistinguishable so tool calls cannot probe for
/// the existence of other users' tasks.
pub const NOT_FOUND_OR_DENIED: &str = "Task not found or you don't have permission";

/// Errors produced while dispatching a tool invocation.
///
/// Validation and not-found/denied results are expected, user-facing
/// conditions. Store and model failures carry internal detail for logs and
/// are downgraded to a generic message before reaching the user.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String),
    #[error("{NOT_FOUND_OR_DENIED}")]
    NotFoundOrDenied,
    #[error("Store error: {0}")]
    Store(String),
    #[error("Model error: {0}")]
    UpstreamModel(String),
}

impl AgentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// The message shown to the end user for this error
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFoundOrDenied => NOT_FOUND_OR_DENIED.to_string(),
            Self::Store(_) => "Something went wrong handling that request. Please try again.".to_string(),
            Self::UpstreamModel(_) => "I couldn't process that, please try again.".to_string(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(e: anyhow::Error) -> Self {
        Self::Store(e.to_string())
    }
}

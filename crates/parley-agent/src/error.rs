//! Error types for the agent crate.
//!
//! Tool handlers return `anyhow::Result`; everything the orchestrator itself
//! can fail on is one of the enums below.

use thiserror::Error;

/// Failures talking to the chat completions provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the conversation on content-policy grounds.
    #[error("rejected by content policy: {reason}")]
    ContentPolicy { reason: String },

    #[error("LLM API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed LLM response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_content_policy(&self) -> bool {
        matches!(self, ProviderError::ContentPolicy { .. })
    }
}

/// Failures talking to a remote tool host.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("unknown remote host '{0}'")]
    UnknownHost(String),

    #[error("transport error talking to '{host}': {message}")]
    Transport { host: String, message: String },

    #[error("remote host '{host}' returned error {code}: {message}")]
    Rpc {
        host: String,
        code: i64,
        message: String,
    },

    #[error("remote tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("remote session already closed")]
    Closed,
}

/// Failures reported by the chat platform adapter.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform request failed: {0}")]
    Request(String),

    /// The platform refused to render the payload (invalid component tree, size limits, ...).
    #[error("render rejected: {0}")]
    Render(String),
}

impl From<parley_markup::MarkupError> for PlatformError {
    fn from(err: parley_markup::MarkupError) -> Self {
        PlatformError::Render(err.to_string())
    }
}

/// Failures that end a reply early.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Rejected again after the sanitizing retry.
    #[error("the provider rejected this conversation: {reason}")]
    Rejected { reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

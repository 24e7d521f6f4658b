//! Startup configuration errors.
//!
//! Every variant is fatal: the process must not start serving with an
//! ambiguous tool namespace or host table.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two `MCP_*` variables resolve to the same lower-cased host name.
    #[error("duplicate remote host name '{0}'")]
    DuplicateHost(String),

    /// A tool name was registered twice, locally or by a remote host.
    #[error("duplicate tool name '{name}' (already registered by {existing}, again by {incoming})")]
    DuplicateTool {
        name: String,
        existing: String,
        incoming: String,
    },

    /// A numeric setting could not be parsed.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// A required setting is missing.
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

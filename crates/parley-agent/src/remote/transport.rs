//! Transport seam for remote tool hosts.

use async_trait::async_trait;
use parley_core::config::RemoteHost;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// One entry of a host's `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// `tools/call` result. Content blocks are kept as raw JSON so unknown
/// block types pass through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

/// Opens connections to remote hosts.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, host: &RemoteHost) -> Result<Box<dyn RemoteConnection>, RemoteError>;
}

/// An open, initialized connection to one host.
#[async_trait]
pub trait RemoteConnection: Send {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, RemoteError>;

    async fn call_tool(&mut self, name: &str, arguments: Value)
        -> Result<CallToolResult, RemoteError>;

    async fn close(&mut self) -> Result<(), RemoteError>;
}

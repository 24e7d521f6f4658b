//! MCP client connections built on `rmcp`.
//!
//! Hosts speak either the HTTP+SSE transport (GET an event stream, POST
//! messages to the endpoint it announces) or streamable HTTP. A URL whose
//! path ends in `/mcp` is treated as streamable HTTP; anything else uses SSE.

use async_trait::async_trait;
use parley_core::config::RemoteHost;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService, ServiceExt};
use rmcp::transport::{SseClientTransport, StreamableHttpClientTransport};
use rmcp::ClientHandler;
use serde_json::Value;

use super::transport::{CallToolResult, RemoteConnection, RemoteConnector, RemoteTool};
use crate::error::RemoteError;

/// Which MCP transport a host URL is served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpTransportKind {
    Sse,
    StreamableHttp,
}

impl McpTransportKind {
    pub fn for_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        if path.trim_end_matches('/').ends_with("/mcp") {
            McpTransportKind::StreamableHttp
        } else {
            McpTransportKind::Sse
        }
    }
}

/// Parley only lists and calls tools; server requests get the defaults.
#[derive(Debug, Clone, Copy, Default)]
struct ParleyClientHandler;

impl ClientHandler for ParleyClientHandler {}

/// Connects to hosts configured as `MCP_<NAME>=<url>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpConnector;

impl McpConnector {
    pub fn new() -> Self {
        Self
    }
}

fn transport_error(host: &str, message: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transport {
        host: host.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl RemoteConnector for McpConnector {
    async fn connect(&self, host: &RemoteHost) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        let kind = McpTransportKind::for_url(&host.url);
        let initialize_failed = |e: &dyn std::fmt::Display| {
            transport_error(&host.name, format!("initialize failed: {e}"))
        };
        let service = match kind {
            McpTransportKind::Sse => {
                let transport = SseClientTransport::start(host.url.as_str())
                    .await
                    .map_err(|e| transport_error(&host.name, e))?;
                ParleyClientHandler
                    .serve(transport)
                    .await
                    .map_err(|e| initialize_failed(&e))?
            }
            McpTransportKind::StreamableHttp => {
                let transport = StreamableHttpClientTransport::from_uri(host.url.as_str());
                ParleyClientHandler
                    .serve(transport)
                    .await
                    .map_err(|e| initialize_failed(&e))?
            }
        };

        tracing::debug!(host = %host.name, transport = ?kind, "remote host connected");
        Ok(Box::new(McpConnection {
            host: host.name.clone(),
            service: Some(service),
        }))
    }
}

struct McpConnection {
    host: String,
    service: Option<RunningService<RoleClient, ParleyClientHandler>>,
}

impl McpConnection {
    fn service(&self) -> Result<&RunningService<RoleClient, ParleyClientHandler>, RemoteError> {
        self.service.as_ref().ok_or(RemoteError::Closed)
    }
}

#[async_trait]
impl RemoteConnection for McpConnection {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, RemoteError> {
        let peer = self.service()?.peer().clone();
        let tools = peer
            .list_all_tools()
            .await
            .map_err(|e| transport_error(&self.host, format!("tools/list: {e}")))?;
        Ok(tools
            .into_iter()
            .map(|t| RemoteTool {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: Value::Object((*t.input_schema).clone()),
            })
            .collect())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, RemoteError> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(transport_error(
                    &self.host,
                    format!("tools/call: arguments must be an object, got {other}"),
                ))
            }
        };
        let peer = self.service()?.peer().clone();
        let result = peer
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| transport_error(&self.host, format!("tools/call: {e}")))?;

        let content = result
            .content
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| transport_error(&self.host, format!("tools/call: {e}")))?;
        Ok(CallToolResult {
            content,
            is_error: result.is_error.unwrap_or(false),
        })
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        let Some(service) = self.service.take() else {
            return Ok(());
        };
        service
            .cancel()
            .await
            .map_err(|e| transport_error(&self.host, format!("close: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_follows_url_path() {
        assert_eq!(McpTransportKind::for_url("http://search:8000/sse"), McpTransportKind::Sse);
        assert_eq!(McpTransportKind::for_url("http://search:8000"), McpTransportKind::Sse);
        assert_eq!(
            McpTransportKind::for_url("http://search:8000/mcp"),
            McpTransportKind::StreamableHttp
        );
        assert_eq!(
            McpTransportKind::for_url("https://tools.example/mcp/?token=x"),
            McpTransportKind::StreamableHttp
        );
        assert_eq!(
            McpTransportKind::for_url("https://tools.example/mcp-tools/sse"),
            McpTransportKind::Sse
        );
    }
}

//! Remote tools: hosts that publish tools over MCP.
//!
//! - `transport`: connector / connection traits and wire types
//! - `mcp`: `rmcp` client over HTTP+SSE or streamable HTTP
//! - `session`: per-reply lazy connection pool
//!
//! [`discover`] runs once at startup and feeds the registry.

mod mcp;
mod session;
mod transport;

pub use mcp::{McpConnector, McpTransportKind};
pub use session::RemoteSession;
pub use transport::{CallToolResult, RemoteConnection, RemoteConnector, RemoteTool};

use parley_core::config::RemoteHostsConfig;

use crate::registry::RemoteToolDescriptor;

/// List every configured host's tools. A host that cannot be reached or
/// listed is logged and skipped; name collisions are left to the registry.
pub async fn discover(
    connector: &dyn RemoteConnector,
    hosts: &RemoteHostsConfig,
) -> Vec<RemoteToolDescriptor> {
    let mut found = Vec::new();
    for host in &hosts.hosts {
        let mut conn = match connector.connect(host).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(host = %host.name, url = %host.url, "remote host unavailable, skipping: {}", e);
                continue;
            }
        };
        let listed = conn.list_tools().await;
        if let Err(e) = conn.close().await {
            tracing::debug!(host = %host.name, "closing discovery connection failed: {}", e);
        }
        match listed {
            Ok(tools) => {
                tracing::info!(host = %host.name, tools = tools.len(), "discovered remote tools");
                found.extend(tools.into_iter().map(|t| {
                    RemoteToolDescriptor::new(
                        &t.name,
                        &host.name,
                        t.description.as_deref().unwrap_or(""),
                        t.input_schema,
                    )
                }));
            }
            Err(e) => {
                tracing::warn!(host = %host.name, "listing remote tools failed, skipping host: {}", e);
            }
        }
    }
    found
}

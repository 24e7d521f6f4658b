//! Per-reply remote session: one lazily opened connection per host,
//! all of them closed when the reply ends.

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::config::{RemoteHost, RemoteHostsConfig};
use serde_json::Value;

use super::transport::{CallToolResult, RemoteConnection, RemoteConnector};
use crate::error::RemoteError;

pub struct RemoteSession {
    connector: Arc<dyn RemoteConnector>,
    hosts: Arc<RemoteHostsConfig>,
    connections: HashMap<String, Box<dyn RemoteConnection>>,
    closed: bool,
}

impl RemoteSession {
    pub fn new(connector: Arc<dyn RemoteConnector>, hosts: Arc<RemoteHostsConfig>) -> Self {
        Self {
            connector,
            hosts,
            connections: HashMap::new(),
            closed: false,
        }
    }

    fn host(&self, name: &str) -> Result<&RemoteHost, RemoteError> {
        self.hosts
            .hosts
            .iter()
            .find(|h| h.name == name)
            .ok_or_else(|| RemoteError::UnknownHost(name.to_string()))
    }

    /// Route a call to `host`, connecting on first use.
    pub async fn call_tool(
        &mut self,
        host: &str,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, RemoteError> {
        if self.closed {
            return Err(RemoteError::Closed);
        }
        if !self.connections.contains_key(host) {
            let target = self.host(host)?.clone();
            let conn = self.connector.connect(&target).await?;
            tracing::debug!(host, "opened remote connection");
            self.connections.insert(host.to_string(), conn);
        }
        let conn = self
            .connections
            .get_mut(host)
            .ok_or_else(|| RemoteError::UnknownHost(host.to_string()))?;
        conn.call_tool(name, arguments).await
    }

    pub fn open_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close every open connection. Safe to call more than once; close
    /// errors are logged, never returned.
    pub async fn close_all(&mut self) {
        self.closed = true;
        for (host, mut conn) in self.connections.drain() {
            if let Err(e) = conn.close().await {
                tracing::warn!(host = %host, "closing remote connection failed: {}", e);
            }
        }
    }

    /// Move the open connections into a new session, leaving this one closed
    /// and empty. Used to finish closing on another task.
    pub fn detach(&mut self) -> RemoteSession {
        let detached = RemoteSession {
            connector: Arc::clone(&self.connector),
            hosts: Arc::clone(&self.hosts),
            connections: std::mem::take(&mut self.connections),
            closed: self.closed,
        };
        self.closed = true;
        detached
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        if self.connections.is_empty() {
            return;
        }
        let mut pending = self.detach();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pending.close_all().await });
            }
            Err(_) => {
                tracing::warn!(
                    open = pending.connections.len(),
                    "remote session dropped outside a runtime; connections not closed"
                );
                // Nothing else can close them; forget instead of recursing into Drop.
                pending.connections.clear();
            }
        }
    }
}

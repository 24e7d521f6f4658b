//! In-memory fakes for the platform, provider and remote hosts.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parley_core::config::RemoteHost;
use serde_json::{json, Value};

use crate::error::{PlatformError, ProviderError, RemoteError};
use crate::llm::{ChatProvider, DeltaStream, StreamDelta, ToolCallDelta};
use crate::platform::{Author, ChatPlatform, InboundMessage, MessagePayload, OutboundMessage};
use crate::remote::{CallToolResult, RemoteConnection, RemoteConnector, RemoteTool};
use crate::types::{ChatMessage, ToolDefinition};

// ─── Remote hosts ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    tools: Vec<RemoteTool>,
    unreachable: bool,
    result: Option<CallToolResult>,
}

impl FakeHost {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names
                .iter()
                .map(|n| RemoteTool {
                    name: n.to_string(),
                    description: Some(format!("{n} tool")),
                    input_schema: json!({"type": "object", "properties": {}}),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_tool_schema(name: &str, schema: Value) -> Self {
        Self {
            tools: vec![RemoteTool {
                name: name.to_string(),
                description: None,
                input_schema: schema,
            }],
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Every call on this host returns `result`.
    pub fn with_result(mut self, result: CallToolResult) -> Self {
        self.result = Some(result);
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeConnector {
    hosts: HashMap<String, FakeHost>,
    open: Arc<AtomicUsize>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn host(mut self, name: &str, host: FakeHost) -> Self {
        self.hosts.insert(name.to_string(), host);
        self
    }

    /// Connections opened and not yet closed.
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConnector for FakeConnector {
    async fn connect(&self, host: &RemoteHost) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        let fake = self
            .hosts
            .get(&host.name)
            .filter(|h| !h.unreachable)
            .cloned()
            .ok_or_else(|| RemoteError::Transport {
                host: host.name.clone(),
                message: "connection refused".into(),
            })?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            host: fake,
            open: Arc::clone(&self.open),
            closed: false,
        }))
    }
}

struct FakeConnection {
    host: FakeHost,
    open: Arc<AtomicUsize>,
    closed: bool,
}

#[async_trait]
impl RemoteConnection for FakeConnection {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, RemoteError> {
        Ok(self.host.tools.clone())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult, RemoteError> {
        if let Some(result) = &self.host.result {
            return Ok(result.clone());
        }
        Ok(CallToolResult {
            content: vec![json!({"type": "text", "text": format!("{name} {arguments}")})],
            is_error: false,
        })
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        if !self.closed {
            self.closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ─── Provider ───────────────────────────────────────────────────────────────

/// What the fake provider does on one request.
#[derive(Debug, Clone)]
pub enum Turn {
    Deltas(Vec<StreamDelta>),
    Reject(String),
}

impl Turn {
    pub fn text(content: &str) -> Self {
        Turn::Deltas(vec![StreamDelta::Content(content.to_string())])
    }

    /// One complete tool call per `(id, name, arguments)`.
    pub fn calls(calls: &[(&str, &str, &str)]) -> Self {
        Turn::Deltas(
            calls
                .iter()
                .map(|(id, name, args)| {
                    StreamDelta::ToolCall(ToolCallDelta {
                        id: Some(id.to_string()),
                        name: Some(name.to_string()),
                        arguments: args.to_string(),
                    })
                })
                .collect(),
        )
    }
}

/// Replays scripted turns and records every transcript it is sent.
/// Once the script runs out it answers with an empty text turn.
#[derive(Debug, Default)]
pub struct FakeProvider {
    script: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeProvider {
    pub fn new(turns: impl IntoIterator<Item = Turn>) -> Self {
        Self {
            script: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<DeltaStream, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let turn = self.script.lock().unwrap().pop_front();
        match turn {
            Some(Turn::Reject(reason)) => Err(ProviderError::ContentPolicy { reason }),
            Some(Turn::Deltas(deltas)) => Ok(stream::iter(deltas.into_iter().map(Ok)).boxed()),
            None => Ok(stream::empty().boxed()),
        }
    }
}

// ─── Platform ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeMessage {
    edits: Mutex<Vec<MessagePayload>>,
    reject_views: bool,
}

impl FakeMessage {
    /// A message whose edits fail whenever they carry a component view.
    pub fn rejecting_views() -> Self {
        Self {
            reject_views: true,
            ..Self::default()
        }
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    pub fn last_edit(&self) -> Option<MessagePayload> {
        self.edits.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl OutboundMessage for FakeMessage {
    async fn edit(&self, payload: MessagePayload) -> Result<(), PlatformError> {
        if self.reject_views && payload.view.is_some() {
            return Err(PlatformError::Render("invalid form body".into()));
        }
        self.edits.lock().unwrap().push(payload);
        Ok(())
    }
}

pub struct FakePlatform {
    pub me: Author,
    pub outbound: Arc<FakeMessage>,
    pub history: Vec<InboundMessage>,
    pub replies: Mutex<Vec<MessagePayload>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            me: bot_author(),
            outbound: Arc::new(FakeMessage::default()),
            history: Vec::new(),
            replies: Mutex::default(),
        }
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn self_author(&self) -> &Author {
        &self.me
    }

    async fn reply(
        &self,
        _to: &InboundMessage,
        payload: MessagePayload,
    ) -> Result<Arc<dyn OutboundMessage>, PlatformError> {
        self.replies.lock().unwrap().push(payload);
        Ok(self.outbound.clone())
    }

    async fn history(
        &self,
        _before: &InboundMessage,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, PlatformError> {
        let skip = self.history.len().saturating_sub(limit);
        Ok(self.history[skip..].to_vec())
    }
}

pub fn bot_author() -> Author {
    Author {
        id: "100".into(),
        name: "parley".into(),
        display_name: Some("Parley".into()),
        nickname: None,
        is_bot: true,
    }
}

pub fn user_author() -> Author {
    Author {
        id: "42".into(),
        name: "alice".into(),
        display_name: Some("Alice".into()),
        nickname: None,
        is_bot: false,
    }
}

// ─── Contexts ───────────────────────────────────────────────────────────────

/// A reply context editing `outbound`, with remote hosts named after `hosts`.
pub fn response_context(
    outbound: &Arc<FakeMessage>,
    connector: &Arc<FakeConnector>,
    hosts: &[&str],
) -> crate::context::ResponseContext {
    let hosts = parley_core::config::RemoteHostsConfig {
        hosts: hosts
            .iter()
            .map(|n| RemoteHost {
                name: n.to_string(),
                url: format!("http://{n}/mcp"),
            })
            .collect(),
    };
    let connector: Arc<dyn RemoteConnector> = connector.clone();
    let outbound: Arc<dyn OutboundMessage> = outbound.clone();
    crate::context::ResponseContext::new(
        user_author(),
        outbound,
        crate::remote::RemoteSession::new(connector, Arc::new(hosts)),
        Arc::new(parley_core::config::ResponseConfig::default()),
    )
}

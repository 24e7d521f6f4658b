//! Tool orchestrator: the request → collect → dispatch loop for one reply.
//!
//! Each turn submits the whole transcript plus every registered tool schema,
//! streams content into the [`ResponseContext`] and accumulates tool calls.
//! A turn without tool calls ends the loop. Calls are dispatched in arrival
//! order and their results appended as `tool` messages; nothing a tool does
//! can abort the loop.
//!
//! A content-policy rejection is retried once on a sanitized transcript
//! (leading system message plus a note about the rejection).

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{FutureExt, StreamExt};
use parley_core::config::{OrchestratorConfig, RemoteHostsConfig, ResponseConfig};
use serde_json::{json, Value};

use crate::accumulator::ToolCallAccumulator;
use crate::context::ResponseContext;
use crate::error::{OrchestratorError, ProviderError};
use crate::llm::{ChatProvider, StreamDelta};
use crate::platform::{ChatPlatform, InboundMessage};
use crate::registry::{BlockingCall, Handler, Registry, ReplyEffects, ToolEntry};
use crate::remote::{McpConnector, RemoteConnector, RemoteSession};
use crate::transcript::TranscriptBuilder;
use crate::types::{ChatMessage, ToolCall};

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Provider requests made, including a recovery retry.
    pub requests: usize,
    /// Turns that dispatched tool calls.
    pub tool_turns: usize,
    pub tool_calls: usize,
    /// A content-policy rejection was recovered from.
    pub recovered: bool,
}

/// Content and tool calls of one model turn.
struct Turn {
    content: String,
    calls: Vec<ToolCall>,
}

pub struct Orchestrator {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<Registry>,
    connector: Arc<dyn RemoteConnector>,
    hosts: Arc<RemoteHostsConfig>,
    response_config: Arc<ResponseConfig>,
    config: OrchestratorConfig,
    transcript: TranscriptBuilder,
}

impl Orchestrator {
    /// An orchestrator with default configuration and no remote hosts.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        registry: Arc<Registry>,
        transcript: TranscriptBuilder,
    ) -> Self {
        Self {
            provider,
            registry,
            connector: Arc::new(McpConnector::new()),
            hosts: Arc::new(RemoteHostsConfig::default()),
            response_config: Arc::new(ResponseConfig::default()),
            config: OrchestratorConfig::default(),
            transcript,
        }
    }

    #[must_use]
    pub fn with_remote(
        mut self,
        connector: Arc<dyn RemoteConnector>,
        hosts: Arc<RemoteHostsConfig>,
    ) -> Self {
        self.connector = connector;
        self.hosts = hosts;
        self
    }

    #[must_use]
    pub fn with_response_config(mut self, config: ResponseConfig) -> Self {
        self.response_config = Arc::new(config);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Answer one inbound message: reply with a placeholder, run the tool
    /// loop, render the result. The reply is finalized and its remote
    /// session closed whatever the outcome.
    pub async fn respond(
        &self,
        platform: &dyn ChatPlatform,
        inbound: &InboundMessage,
    ) -> Result<RunSummary, OrchestratorError> {
        let history = match platform.history(inbound, self.config.history_limit).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(message = %inbound.id, "fetching history failed, answering without it: {}", e);
                Vec::new()
            }
        };
        let transcript = self
            .transcript
            .build(platform.self_author(), inbound, &history);

        let session = RemoteSession::new(Arc::clone(&self.connector), Arc::clone(&self.hosts));
        let mut ctx = ResponseContext::start(
            platform,
            inbound,
            session,
            Arc::clone(&self.response_config),
        )
        .await?;

        match self.run(&mut ctx, transcript).await {
            Ok(summary) => {
                ctx.finish().await;
                tracing::info!(
                    message = %inbound.id,
                    requests = summary.requests,
                    tool_calls = summary.tool_calls,
                    "reply finished"
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(message = %inbound.id, "reply failed: {}", e);
                ctx.fail(&e).await;
                Err(e)
            }
        }
    }

    /// Run the tool loop on `transcript`, streaming into `ctx`. Does not
    /// finalize `ctx`.
    pub async fn run(
        &self,
        ctx: &mut ResponseContext,
        mut transcript: Vec<ChatMessage>,
    ) -> Result<RunSummary, OrchestratorError> {
        let mut summary = RunSummary::default();

        loop {
            summary.requests += 1;
            let turn = match self.collect_turn(ctx, &transcript).await {
                Ok(turn) => turn,
                Err(ProviderError::ContentPolicy { reason }) if !summary.recovered => {
                    tracing::warn!(%reason, "content policy rejection; retrying on a sanitized transcript");
                    transcript = sanitize(transcript, &reason);
                    summary.recovered = true;
                    continue;
                }
                Err(ProviderError::ContentPolicy { reason }) => {
                    return Err(OrchestratorError::Rejected { reason });
                }
                Err(e) => return Err(e.into()),
            };

            if turn.calls.is_empty() {
                break;
            }
            if let Some(max) = self.config.max_tool_turns {
                if summary.tool_turns >= max {
                    tracing::warn!(
                        max_turns = max,
                        pending_calls = turn.calls.len(),
                        "tool turn limit reached; finishing with the answer so far"
                    );
                    break;
                }
            }

            summary.tool_turns += 1;
            summary.tool_calls += turn.calls.len();
            let content = (!turn.content.is_empty()).then_some(turn.content.as_str());
            transcript.push(ChatMessage::assistant_with_tool_calls(
                content,
                turn.calls.clone(),
            ));
            for call in &turn.calls {
                let output = self.dispatch(ctx, call).await;
                transcript.push(ChatMessage::tool_result(&call.id, &output));
            }
        }

        Ok(summary)
    }

    async fn collect_turn(
        &self,
        ctx: &mut ResponseContext,
        transcript: &[ChatMessage],
    ) -> Result<Turn, ProviderError> {
        let mut stream = self
            .provider
            .chat_stream(transcript, self.registry.tool_definitions())
            .await?;

        let mut content = String::new();
        let mut calls = ToolCallAccumulator::default();
        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::Content(text) => {
                    content.push_str(&text);
                    ctx.add_response(&text).await;
                }
                StreamDelta::ToolCall(fragment) => calls.push(fragment),
            }
        }
        Ok(Turn {
            content,
            calls: calls.into_calls(),
        })
    }

    /// Run one tool call and return the text of its `tool` message.
    async fn dispatch(&self, ctx: &mut ResponseContext, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let Some(entry) = self.registry.get(name) else {
            tracing::warn!(tool = name, "model called an unknown tool");
            return format!("Tool '{name}' not found.");
        };

        let args = match parse_arguments(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = name, "unparseable tool arguments: {}", e);
                return error_json(&format!("invalid arguments: {e}"));
            }
        };
        tracing::debug!(tool = name, %args, "calling tool");

        let result = match entry {
            ToolEntry::Local(desc) => match &desc.handler {
                Handler::Async(handler) => AssertUnwindSafe(handler.call(ctx, args))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panicked(&*panic))),
                Handler::Blocking(f) => {
                    let f = Arc::clone(f);
                    let effects = ReplyEffects::default();
                    let input = BlockingCall {
                        author: ctx.author().clone(),
                        args,
                        additional_data: ctx.additional_data.clone(),
                        effects: effects.clone(),
                    };
                    let result = match tokio::task::spawn_blocking(move || f(input)).await {
                        Ok(result) => result,
                        Err(e) if e.is_panic() => Err(panicked(&*e.into_panic())),
                        Err(e) => Err(anyhow::anyhow!("tool task failed: {e}")),
                    };
                    effects.apply(ctx);
                    result
                }
            },
            ToolEntry::Remote(desc) => ctx
                .call_remote_tool(desc, args)
                .await
                .map_err(anyhow::Error::from),
        };

        match result {
            Ok(value) => serde_json::to_string(&value)
                .unwrap_or_else(|e| error_json(&format!("unserializable result: {e}"))),
            Err(e) => {
                tracing::warn!(tool = name, "tool failed: {:#}", e);
                error_json(&format!("{e:#}"))
            }
        }
    }
}

/// Models send an empty string for tools without parameters.
fn parse_arguments(raw: &str) -> serde_json::Result<Value> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}

fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}

fn panicked(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    anyhow::anyhow!("tool panicked: {message}")
}

/// Keep only a leading system message and explain the rejection.
fn sanitize(transcript: Vec<ChatMessage>, reason: &str) -> Vec<ChatMessage> {
    let mut kept: Vec<ChatMessage> = transcript
        .into_iter()
        .take(1)
        .filter(ChatMessage::is_system)
        .collect();
    kept.push(ChatMessage::system(&format!(
        "The conversation was rejected by the provider's content policy ({reason}). \
         The earlier messages were removed. Tell the user you cannot help with that request."
    )));
    kept
}

//! Chat completions provider seam.
//!
//! A provider turns a transcript plus tool schemas into a stream of
//! [`StreamDelta`]s. Streaming and non-streaming APIs look the same to the
//! orchestrator: a non-streaming reply is just a short stream.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{ChatMessage, ToolDefinition};

mod openai;


pub use openai::OpenAiClient;

/// One incremental piece of a model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    Content(String),
    ToolCall(ToolCallDelta),
}

/// A tool-call fragment. A fragment with an `id` starts a new call; one
/// without continues the most recent call's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallDelta {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

pub type DeltaStream = BoxStream<'static, Result<StreamDelta, ProviderError>>;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Submit the transcript. Content-policy rejections surface as
    /// [`ProviderError::ContentPolicy`], either here or from the stream.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<DeltaStream, ProviderError>;
}

// ─── Content policy ─────────────────────────────────────────────────────────

const CONTENT_POLICY_CODES: &[&str] = &[
    "content_filter",
    "content_policy_violation",
    "ResponsibleAIPolicyViolation",
];

/// Reason text when an error body is a content-policy rejection.
pub(crate) fn content_policy_reason(body: &Value) -> Option<String> {
    let err = body.get("error")?;
    let code_matches = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .is_some_and(|c| CONTENT_POLICY_CODES.contains(&c))
    };
    let hit = code_matches(err.get("code"))
        || code_matches(err.get("innererror").and_then(|i| i.get("code")));
    if !hit {
        return None;
    }
    Some(
        err.get("message")
            .and_then(Value::as_str)
            .unwrap_or("content policy violation")
            .to_string(),
    )
}

/// Map a non-2xx response to an error.
pub(crate) fn classify_error(status: u16, body: &str) -> ProviderError {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        if let Some(reason) = content_policy_reason(&v) {
            return ProviderError::ContentPolicy { reason };
        }
    }
    ProviderError::Api {
        status,
        body: body.to_string(),
    }
}

fn filtered() -> ProviderError {
    ProviderError::ContentPolicy {
        reason: "the response was stopped by the content filter".to_string(),
    }
}

// ─── Response decoding ──────────────────────────────────────────────────────

fn tool_call_delta(tc: &Value) -> ToolCallDelta {
    let func = tc.get("function");
    ToolCallDelta {
        id: tc
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        name: func
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        arguments: func
            .and_then(|f| f.get("arguments"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Deltas of one streamed `chat.completion.chunk`.
pub(crate) fn chunk_deltas(chunk: &Value) -> Result<Vec<StreamDelta>, ProviderError> {
    if let Some(reason) = content_policy_reason(chunk) {
        return Err(ProviderError::ContentPolicy { reason });
    }
    let mut deltas = Vec::new();
    let choices = chunk.get("choices").and_then(Value::as_array);
    for choice in choices.into_iter().flatten() {
        if let Some(delta) = choice.get("delta") {
            if let Some(text) = delta.get("content").and_then(Value::as_str) {
                if !text.is_empty() {
                    deltas.push(StreamDelta::Content(text.to_string()));
                }
            }
            let calls = delta.get("tool_calls").and_then(Value::as_array);
            for tc in calls.into_iter().flatten() {
                deltas.push(StreamDelta::ToolCall(tool_call_delta(tc)));
            }
        }
        if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
            return Err(filtered());
        }
    }
    Ok(deltas)
}

/// Deltas equivalent to a complete, non-streamed `chat.completion`.
pub(crate) fn completion_deltas(resp: &Value) -> Result<Vec<StreamDelta>, ProviderError> {
    let choice = resp
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| ProviderError::Decode("no choices in LLM response".to_string()))?;
    if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
        return Err(filtered());
    }
    let mut deltas = Vec::new();
    let message = choice.get("message");
    if let Some(text) = message.and_then(|m| m.get("content")).and_then(Value::as_str) {
        if !text.is_empty() {
            deltas.push(StreamDelta::Content(text.to_string()));
        }
    }
    let calls = message
        .and_then(|m| m.get("tool_calls"))
        .and_then(Value::as_array);
    for tc in calls.into_iter().flatten() {
        deltas.push(StreamDelta::ToolCall(tool_call_delta(tc)));
    }
    Ok(deltas)
}

// ─── SSE ────────────────────────────────────────────────────────────────────

struct SseState<S> {
    inner: Pin<Box<S>>,
    // Bytes of the incomplete trailing line
    buffer: Vec<u8>,
    pending: VecDeque<Result<StreamDelta, ProviderError>>,
    done: bool,
}

impl<S> SseState<S> {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim();

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                self.done = true;
                self.buffer.clear();
                return;
            }
            let Ok(chunk) = serde_json::from_str::<Value>(data) else {
                tracing::debug!("skipping non-JSON SSE data line");
                continue;
            };
            match chunk_deltas(&chunk) {
                Ok(deltas) => self.pending.extend(deltas.into_iter().map(Ok)),
                Err(e) => self.pending.push_back(Err(e)),
            }
        }
    }
}

/// Decode an OpenAI-style SSE byte stream into deltas. The stream ends at
/// `[DONE]`, at end of input, or right after the first error.
pub(crate) fn sse_deltas<S, B, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let state = SseState {
        inner: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if item.is_err() {
                    st.done = true;
                    st.pending.clear();
                }
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    st.buffer.extend_from_slice(chunk.as_ref());
                    st.drain_lines();
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.done = true;
                    st.buffer.push(b'\n');
                    st.drain_lines();
                }
            }
        }
    })
    .boxed()
}

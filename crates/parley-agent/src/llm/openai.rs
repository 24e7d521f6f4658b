//! OpenAI-compatible and Azure OpenAI chat completions.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parley_core::config::{ApiKind, LlmConfig};
use serde_json::{json, Value};

use super::{classify_error, completion_deltas, sse_deltas, ChatProvider, DeltaStream};
use crate::error::ProviderError;
use crate::types::{ChatMessage, ToolDefinition};

pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()?;
        Ok(Self { http, config })
    }

    pub(super) fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        match self.config.kind {
            ApiKind::OpenAi => format!("{base}/chat/completions"),
            ApiKind::Azure => format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={}",
                self.config.model, self.config.azure_api_version
            ),
        }
    }

    pub(super) fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
        let mut body = json!({
            "messages": messages,
            "stream": self.config.stream,
        });
        // Azure routes by deployment in the URL.
        if self.config.kind == ApiKind::OpenAi {
            body["model"] = json!(self.config.model);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<DeltaStream, ProviderError> {
        let body = self.request_body(messages, tools);
        let req = self
            .http
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        let req = match self.config.kind {
            ApiKind::OpenAi => req.bearer_auth(&self.config.api_key),
            ApiKind::Azure => req.header("api-key", &self.config.api_key),
        };

        tracing::debug!(
            messages = messages.len(),
            tools = tools.len(),
            stream = self.config.stream,
            "chat completion request"
        );
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            let err = classify_error(status.as_u16(), &body_text);
            tracing::warn!(status = status.as_u16(), "chat completion failed: {}", err);
            return Err(err);
        }

        if self.config.stream {
            return Ok(sse_deltas(resp.bytes_stream()));
        }
        let value: Value = resp.json().await?;
        let deltas = completion_deltas(&value)?;
        Ok(stream::iter(deltas.into_iter().map(Ok)).boxed())
    }
}

//! Response context: everything one reply accumulates while the tool loop runs.
//!
//! A context owns the outbound message it keeps editing and the remote
//! session its tool calls go through. Incremental renders are throttled;
//! [`ResponseContext::finish`] performs the single final render and closes
//! the session. Dropping an unfinished context (task cancelled) spawns the
//! same finalization onto the runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use parley_core::config::ResponseConfig;
use parley_markup::MarkupNode;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::error::{PlatformError, RemoteError};
use crate::platform::{
    Attachment, Author, ChatPlatform, Embed, InboundMessage, MessagePayload, OutboundMessage,
};
use crate::registry::RemoteToolDescriptor;
use crate::remote::RemoteSession;

const EMPTY_RESPONSE: &str = "-# No response.";
const TRUNCATION_MARKER: &str = "\n-# … (truncated, full response attached as response.md)";
const OVERFLOW_FILENAME: &str = "response.md";

pub struct ResponseContext {
    author: Author,
    outbound: Arc<dyn OutboundMessage>,
    config: Arc<ResponseConfig>,
    session: RemoteSession,

    response: String,
    attachments: Vec<Attachment>,
    /// Produced by tools but not shown until moved with `attach_file`.
    temp_attachments: Vec<Attachment>,
    embeds: Vec<Embed>,
    attachments_dirty: bool,
    embeds_dirty: bool,
    last_edit: Option<Instant>,
    finished: bool,

    /// Per-reply scratch space for tool handlers.
    pub additional_data: HashMap<String, Value>,
}

impl ResponseContext {
    pub fn new(
        author: Author,
        outbound: Arc<dyn OutboundMessage>,
        session: RemoteSession,
        config: Arc<ResponseConfig>,
    ) -> Self {
        Self {
            author,
            outbound,
            config,
            session,
            response: String::new(),
            attachments: Vec::new(),
            temp_attachments: Vec::new(),
            embeds: Vec::new(),
            attachments_dirty: false,
            embeds_dirty: false,
            last_edit: None,
            finished: false,
            additional_data: HashMap::new(),
        }
    }

    /// Reply to `inbound` with the typing placeholder and wrap the new message.
    pub async fn start(
        platform: &dyn ChatPlatform,
        inbound: &InboundMessage,
        session: RemoteSession,
        config: Arc<ResponseConfig>,
    ) -> Result<Self, PlatformError> {
        let placeholder = format!("-# {}", config.indicators.typing());
        let outbound = platform
            .reply(inbound, MessagePayload::text(placeholder))
            .await?;
        Ok(Self::new(inbound.author.clone(), outbound, session, config))
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn temp_attachments(&self) -> &[Attachment] {
        &self.temp_attachments
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    pub fn has_embeds(&self) -> bool {
        !self.embeds.is_empty()
    }

    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ─── Streaming ──────────────────────────────────────────────────────────

    /// Append a content fragment and re-render if the throttle allows.
    pub async fn add_response(&mut self, fragment: &str) {
        self.response.push_str(fragment);
        if self.response.trim().is_empty() {
            return;
        }
        if let Some(last) = self.last_edit {
            if last.elapsed() < self.config.render_interval {
                return;
            }
        }

        let typing = self.config.indicators.typing();
        let room = self
            .config
            .message_limit
            .saturating_sub(typing.chars().count());
        let mut preview = take_chars(&self.response, room).to_string();
        preview.push_str(typing);

        let payload = MessagePayload {
            content: Some(preview),
            ..self.take_pending()
        };
        if let Err(e) = self.outbound.edit(payload).await {
            tracing::warn!("incremental render failed: {}", e);
        }
        self.last_edit = Some(Instant::now());
    }

    /// Show what the agent is doing, prefixed with the loading indicator.
    pub async fn set_status(&mut self, status: &str) -> Result<(), PlatformError> {
        let content = format!("{} {}", self.config.indicators.loading(), status);
        self.outbound.edit(MessagePayload::text(content)).await
    }

    /// Embeds and attachments changed since the last edit.
    fn take_pending(&mut self) -> MessagePayload {
        let mut payload = MessagePayload::default();
        if std::mem::take(&mut self.embeds_dirty) {
            payload.embeds = Some(self.embeds.clone());
        }
        if std::mem::take(&mut self.attachments_dirty) {
            payload.attachments = Some(self.attachments.clone());
        }
        payload
    }

    // ─── Attachments & embeds ───────────────────────────────────────────────

    /// Decode a base64 blob into a hidden attachment and return its generated name.
    pub fn add_temp_attachment(
        &mut self,
        data: &str,
        content_type: &str,
    ) -> Result<String, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
        let filename = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            extension_for(content_type)
        );
        self.temp_attachments.push(Attachment {
            filename: filename.clone(),
            content_type: content_type.to_string(),
            data: bytes,
        });
        Ok(filename)
    }

    /// Move a hidden attachment into the visible list. `None` if no such file.
    pub fn move_temp_attachment(&mut self, filename: &str) -> Option<String> {
        let idx = self
            .temp_attachments
            .iter()
            .position(|a| a.filename == filename)?;
        let attachment = self.temp_attachments.remove(idx);
        self.attachments.push(attachment);
        self.attachments_dirty = true;
        Some(filename.to_string())
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
        self.attachments_dirty = true;
    }

    pub fn set_embeds(&mut self, embeds: Vec<Embed>) {
        self.embeds.extend(embeds);
        self.embeds_dirty = true;
    }

    // ─── Remote tools ───────────────────────────────────────────────────────

    /// Call a remote tool through this reply's session. Image blocks become
    /// temporary attachments and are replaced by a text block naming the file.
    pub async fn call_remote_tool(
        &mut self,
        tool: &RemoteToolDescriptor,
        arguments: Value,
    ) -> Result<Value, RemoteError> {
        let result = self
            .session
            .call_tool(&tool.host, &tool.name, arguments)
            .await?;

        if result.is_error {
            let message = result
                .content
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(RemoteError::ToolFailed {
                tool: tool.name.clone(),
                message,
            });
        }

        let content: Vec<Value> = result
            .content
            .into_iter()
            .map(|block| self.translate_block(block))
            .collect();
        Ok(json!({ "content": content }))
    }

    fn translate_block(&mut self, block: Value) -> Value {
        if block.get("type").and_then(Value::as_str) != Some("image") {
            return block;
        }
        let Some(data) = block.get("data").and_then(Value::as_str) else {
            return block;
        };
        let mime = block
            .get("mimeType")
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        let text = match self.add_temp_attachment(data, mime) {
            Ok(filename) => format!(
                "Image stored as temporary attachment '{filename}'. Call attach_file with this filename to show it."
            ),
            Err(e) => {
                tracing::warn!("remote image block is not valid base64: {}", e);
                format!("Image could not be decoded: {e}")
            }
        };
        json!({ "type": "text", "text": text })
    }

    // ─── Finalization ───────────────────────────────────────────────────────

    /// Final render (exactly one edit, or a diagnostic edit if it is
    /// rejected), then close the session. No-op after the first call.
    pub async fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let rendered = match self.final_payload() {
            Ok(payload) => self.outbound.edit(payload).await,
            Err(e) => Err(e),
        };
        if let Err(e) = rendered {
            tracing::warn!("final render failed: {}", e);
            let diagnostic = self.diagnostic_payload(&e);
            if let Err(e) = self.outbound.edit(diagnostic).await {
                tracing::error!("diagnostic render failed: {}", e);
            }
        }
        self.session.close_all().await;
    }

    /// Append a diagnostic line for `err`, then finish.
    pub async fn fail(&mut self, err: &dyn fmt::Display) {
        if !self.response.is_empty() {
            self.response.push_str("\n\n");
        }
        self.response.push_str(&format!("-# ⚠️ Error: {err}"));
        self.finish().await;
    }

    fn final_payload(&self) -> Result<MessagePayload, PlatformError> {
        let text = self.response.trim();
        let mut attachments = self.attachments_dirty.then(|| self.attachments.clone());
        let embeds = self.embeds_dirty.then(|| self.embeds.clone());

        if text.is_empty() {
            let content = if self.embeds.is_empty() && self.attachments.is_empty() {
                EMPTY_RESPONSE
            } else {
                ""
            };
            return Ok(MessagePayload {
                content: Some(content.to_string()),
                view: None,
                embeds,
                attachments,
            });
        }

        let limit = self.config.message_limit;
        let visible = if text.chars().count() > limit {
            let room = limit.saturating_sub(TRUNCATION_MARKER.chars().count());
            let mut excerpt = take_chars(text, room).trim_end().to_string();
            excerpt.push_str(TRUNCATION_MARKER);
            let mut all = self.attachments.clone();
            all.push(Attachment {
                filename: OVERFLOW_FILENAME.to_string(),
                content_type: "text/markdown".to_string(),
                data: text.as_bytes().to_vec(),
            });
            attachments = Some(all);
            excerpt
        } else {
            text.to_string()
        };

        let view = parley_markup::parse(&visible);
        view.iter().try_for_each(MarkupNode::validate)?;

        Ok(MessagePayload {
            content: Some(visible),
            view: Some(view),
            embeds,
            attachments,
        })
    }

    fn diagnostic_payload(&self, err: &PlatformError) -> MessagePayload {
        let note = format!("\n-# ⚠️ Failed to render response: {err}");
        let room = self
            .config
            .message_limit
            .saturating_sub(note.chars().count());
        let mut content = take_chars(self.response.trim(), room).to_string();
        content.push_str(&note);
        MessagePayload::text(content)
    }
}

impl Drop for ResponseContext {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let payload = self
            .final_payload()
            .unwrap_or_else(|e| self.diagnostic_payload(&e));
        let outbound = Arc::clone(&self.outbound);
        let mut session = self.session.detach();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("response context dropped unfinished; finalizing in background");
                handle.spawn(async move {
                    if let Err(e) = outbound.edit(payload).await {
                        tracing::warn!("final render after cancellation failed: {}", e);
                    }
                    session.close_all().await;
                });
            }
            Err(_) => {
                tracing::warn!("response context dropped outside a runtime; final render skipped");
            }
        }
    }
}

/// The first `n` characters of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "audio/mpeg" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        "video/mp4" => ".mp4",
        "application/pdf" => ".pdf",
        "application/json" => ".json",
        "text/plain" => ".txt",
        "text/markdown" => ".md",
        "text/csv" => ".csv",
        _ => "",
    }
}

#[cfg(test)]
mod tests;

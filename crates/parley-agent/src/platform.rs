//! Chat platform seam: what the agent needs from the messaging service.
//!
//! Adapters implement [`ChatPlatform`] and [`OutboundMessage`]; everything in
//! this crate talks to the platform only through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use parley_markup::MarkupNode;
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    pub id: String,
    /// Unique account name.
    pub name: String,
    pub display_name: Option<String>,
    /// Per-server nickname, when the platform has one.
    pub nickname: Option<String>,
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub nsfw: bool,
}

/// A message as received from the platform (the trigger, or an entry of history).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InboundMessage {
    pub id: String,
    pub channel: Channel,
    pub author: Author,
    pub content: String,
    /// Component tree of a message this agent sent earlier.
    pub view: Option<Vec<MarkupNode>>,
    /// The referenced message, already fetched by the adapter.
    pub reply_to: Option<Box<InboundMessage>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

// ─── Embeds ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

// ─── Payloads ───────────────────────────────────────────────────────────────

/// Edit/reply payload. `None` fields are left unchanged by an edit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessagePayload {
    pub content: Option<String>,
    /// Rendered component tree; adapters prefer it over `content` when set.
    pub view: Option<Vec<MarkupNode>>,
    pub embeds: Option<Vec<Embed>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// The single message a reply keeps editing.
#[async_trait]
pub trait OutboundMessage: Send + Sync {
    async fn edit(&self, payload: MessagePayload) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Identity of the agent account on this platform.
    fn self_author(&self) -> &Author;

    async fn reply(
        &self,
        to: &InboundMessage,
        payload: MessagePayload,
    ) -> Result<Arc<dyn OutboundMessage>, PlatformError>;

    /// Up to `limit` messages before `before`, oldest first.
    async fn history(
        &self,
        before: &InboundMessage,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, PlatformError>;
}

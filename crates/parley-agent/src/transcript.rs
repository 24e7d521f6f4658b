//! Transcript building: system prompt, recent history, the inbound message.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context as _;
use regex::{Captures, Regex};

use crate::platform::{Author, InboundMessage};
use crate::types::ChatMessage;

// ─── Prompt template ────────────────────────────────────────────────────────

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([_A-Za-z][_A-Za-z0-9]*)\}|([_A-Za-z][_A-Za-z0-9]*))")
        .expect("placeholder regex")
});

/// System prompt with `$name` / `${name}` placeholders. `$$` is a literal
/// `$`; unknown placeholders are left as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read system prompt {}", path.display()))?;
        Ok(Self::new(source))
    }

    pub fn render(&self, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                if caps.get(1).is_some() {
                    return "$".to_string();
                }
                let name = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                match vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

// ─── Transcript ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TranscriptBuilder {
    prompt: PromptTemplate,
    extra: HashMap<String, String>,
}

impl TranscriptBuilder {
    pub fn new(prompt: PromptTemplate) -> Self {
        Self {
            prompt,
            extra: HashMap::new(),
        }
    }

    /// Add a deployment-specific prompt variable.
    #[must_use]
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.extra.insert(name.to_string(), value.to_string());
        self
    }

    pub fn system_prompt(&self, me: &Author, inbound: &InboundMessage) -> String {
        let mut vars = self.extra.clone();
        vars.insert("bot_mention".into(), format!("<@{}>", me.id));
        vars.insert("bot_name".into(), me.name.clone());
        vars.insert("is_nsfw".into(), inbound.channel.nsfw.to_string());
        vars.insert("channel_id".into(), inbound.channel.id.clone());
        vars.insert("channel_name".into(), inbound.channel.name.clone());
        self.prompt.render(&vars)
    }

    /// System prompt, then `history` (oldest first), then the inbound message.
    /// Messages from other bots are left out.
    pub fn build(
        &self,
        me: &Author,
        inbound: &InboundMessage,
        history: &[InboundMessage],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt(me, inbound)));
        for msg in history {
            if msg.author.id == me.id {
                messages.push(ChatMessage::assistant(&own_message_text(msg)));
            } else if !msg.author.is_bot {
                messages.push(ChatMessage::user(&format_user_message(msg, me)));
            }
        }
        messages.push(ChatMessage::user(&format_user_message(inbound, me)));
        messages
    }
}

/// Text of a message this agent sent, as markup when it carried components.
fn own_message_text(msg: &InboundMessage) -> String {
    match &msg.view {
        Some(view) => parley_markup::serialize(view),
        None => msg.content.clone(),
    }
}

/// Message content followed by a context block the model can read ids and
/// reply information from.
pub fn format_user_message(msg: &InboundMessage, me: &Author) -> String {
    let author = &msg.author;
    let mut context: Vec<(&str, String)> = vec![
        ("User ID", author.id.clone()),
        ("Username", author.name.clone()),
        (
            "User Display Name",
            author.display_name.clone().unwrap_or_else(|| author.name.clone()),
        ),
        ("Message ID", msg.id.clone()),
    ];
    if let Some(nick) = &author.nickname {
        context.push(("User Nickname", nick.clone()));
    }
    if let Some(reply) = &msg.reply_to {
        if reply.author.id == me.id {
            context.push(("Reply Your Message ID", reply.id.clone()));
            context.push(("Reply To Your Message Content", own_message_text(reply)));
        } else {
            context.push(("Message Reply To Message ID", reply.id.clone()));
            context.push(("Message Reply To Author", reply.author.name.clone()));
            context.push(("Message Reply To Author ID", reply.author.id.clone()));
            let content = if reply.content.is_empty() {
                "Empty Content".to_string()
            } else {
                reply.content.clone()
            };
            context.push(("Message Reply To Content", content));
        }
    }

    let block = context
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n\n# User Message Context (Context for You)\n\n{}",
        msg.content, block
    )
}

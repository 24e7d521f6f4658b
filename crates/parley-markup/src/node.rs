//! Component tree produced by the parser and consumed by platform adapters.

use std::fmt;

use thiserror::Error;

/// One rich-UI component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(String),
    Container(Vec<MarkupNode>),
    ActionRow(Vec<MarkupNode>),
    Section(Section),
    MediaGallery(Vec<MediaItem>),
    Select(SelectMenu),
    Button(Button),
    ButtonLink(ButtonLink),
    Separator(SeparatorSize),
}

/// A body with exactly one accessory on the side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub accessory: Accessory,
    pub children: Vec<MarkupNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessory {
    Thumbnail(Thumbnail),
    Button(Button),
    Link(ButtonLink),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub url: String,
    pub description: Option<String>,
    pub spoiler: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub url: String,
    pub description: Option<String>,
    pub spoiler: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub placeholder: String,
    pub options: Vec<String>,
    /// 1..=9
    pub min_values: u8,
    /// 1..=9
    pub max_values: u8,
    pub disabled: bool,
    /// Assigned by the platform once sent; never part of the markup.
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
    /// Assigned by the platform once sent; never part of the markup.
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Success,
    Danger,
    Link,
}

impl ButtonStyle {
    /// Accepts `primary` as well as the `ButtonStyle.primary` spelling.
    /// Unknown names fall back to [`ButtonStyle::Primary`].
    pub fn parse(raw: &str) -> Self {
        let name = raw.trim();
        let name = name.strip_prefix("ButtonStyle.").unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "primary" | "blurple" => ButtonStyle::Primary,
            "secondary" | "grey" | "gray" => ButtonStyle::Secondary,
            "success" | "green" => ButtonStyle::Success,
            "danger" | "red" => ButtonStyle::Danger,
            "link" | "url" => ButtonStyle::Link,
            other => {
                tracing::debug!(style = other, "unknown button style, using primary");
                ButtonStyle::Primary
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonStyle::Primary => "primary",
            ButtonStyle::Secondary => "secondary",
            ButtonStyle::Success => "success",
            ButtonStyle::Danger => "danger",
            ButtonStyle::Link => "link",
        }
    }
}

impl fmt::Display for ButtonStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeparatorSize {
    #[default]
    Small,
    Large,
}

impl SeparatorSize {
    pub fn from_digit(d: u8) -> Self {
        if d == 2 {
            SeparatorSize::Large
        } else {
            SeparatorSize::Small
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            SeparatorSize::Small => 1,
            SeparatorSize::Large => 2,
        }
    }
}

// ─── Structural checks ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("select menu '{0}' must be the only child of an action row")]
    SelectNotAlone(String),

    #[error("select menu '{0}' is not inside an action row")]
    SelectOutsideActionRow(String),

    #[error("action row nested inside another action row")]
    NestedActionRow,

    #[error("media gallery has no items")]
    EmptyGallery,
}

impl MarkupNode {
    /// Check the tree invariants a platform would reject at send time.
    pub fn validate(&self) -> Result<(), MarkupError> {
        self.validate_in(false)
    }

    fn validate_in(&self, in_action_row: bool) -> Result<(), MarkupError> {
        match self {
            MarkupNode::ActionRow(children) => {
                if in_action_row {
                    return Err(MarkupError::NestedActionRow);
                }
                let has_select = children.iter().find_map(|c| match c {
                    MarkupNode::Select(s) => Some(s),
                    _ => None,
                });
                if let Some(select) = has_select {
                    if children.len() != 1 {
                        return Err(MarkupError::SelectNotAlone(select.placeholder.clone()));
                    }
                }
                children.iter().try_for_each(|c| c.validate_in(true))
            }
            MarkupNode::Select(select) if !in_action_row => Err(
                MarkupError::SelectOutsideActionRow(select.placeholder.clone()),
            ),
            MarkupNode::Container(children) => {
                children.iter().try_for_each(|c| c.validate_in(false))
            }
            MarkupNode::Section(section) => section
                .children
                .iter()
                .try_for_each(|c| c.validate_in(false)),
            MarkupNode::MediaGallery(items) if items.is_empty() => Err(MarkupError::EmptyGallery),
            _ => Ok(()),
        }
    }
}

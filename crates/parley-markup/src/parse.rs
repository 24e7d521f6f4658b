//! Markup text → tree.
//!
//! Each step runs every rule against the remaining text and keeps the match
//! with the smallest start offset; on a tie the rule listed first wins. Text
//! before the match becomes a [`MarkupNode::Text`], block bodies are parsed
//! recursively, and whatever is left after the last match is trailing text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::node::{
    Accessory, Button, ButtonLink, ButtonStyle, MarkupNode, MediaItem, Section, SelectMenu,
    SeparatorSize, Thumbnail,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Container,
    MediaGallery,
    ActionRow,
    SectionThumbnail,
    SectionButtonLink,
    SectionButton,
    MediaGalleryItem,
    Select,
    ButtonLink,
    Button,
    Separator,
}

/// Closing half of a block rule.
struct Block {
    end: Regex,
    /// Openers that share `end`; counted so nested blocks close correctly.
    nest: Regex,
}

struct Rule {
    kind: RuleKind,
    start: Regex,
    block: Option<Block>,
}

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("markup rule regex")
}

fn block(end: &str, nest: &str) -> Option<Block> {
    Some(Block {
        end: rx(end),
        nest: rx(nest),
    })
}

const SECTION_END: &str = r"\[/Section/\]";
const SECTION_OPEN: &str = r"\[#Section(?:Thumbnail|Button)#";

// Order matters: it is the tie-break between matches at the same offset.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule {
            kind: RuleKind::Container,
            start: rx(r"\[#Container#\]"),
            block: block(r"\[/Container/\]", r"\[#Container#\]"),
        },
        Rule {
            kind: RuleKind::MediaGallery,
            start: rx(r"\[#MediaGallery#\]"),
            block: block(r"\[/MediaGallery/\]", r"\[#MediaGallery#\]"),
        },
        Rule {
            kind: RuleKind::ActionRow,
            start: rx(r"\[#ActionRow#\]"),
            block: block(r"\[/ActionRow/\]", r"\[#ActionRow#\]"),
        },
        Rule {
            kind: RuleKind::SectionThumbnail,
            start: rx(r"\[#SectionThumbnail#([^\]]*)\]\(thn\|([^|]+)\|([01])\)"),
            block: block(SECTION_END, SECTION_OPEN),
        },
        Rule {
            kind: RuleKind::SectionButtonLink,
            start: rx(r"\[#SectionButton#([^\]]+)\]\(btu\|([^)]+)\)"),
            block: block(SECTION_END, SECTION_OPEN),
        },
        Rule {
            kind: RuleKind::SectionButton,
            start: rx(r"\[#SectionButton#([^\]]+)\]\(bts\|([^|]+)\|([01])\)"),
            block: block(SECTION_END, SECTION_OPEN),
        },
        Rule {
            kind: RuleKind::MediaGalleryItem,
            start: rx(r"\[([^\]]*)\]\(media\|([^|]+)\|([01])\)"),
            block: None,
        },
        Rule {
            kind: RuleKind::Select,
            start: rx(r"\[([^\]]+)\]\(st\|([^|]+)\|([1-9])\|([1-9])\|([01])\)"),
            block: None,
        },
        Rule {
            kind: RuleKind::ButtonLink,
            start: rx(r"\[([^\]]+)\]\(btu\|([^)]+)\)"),
            block: None,
        },
        Rule {
            kind: RuleKind::Button,
            start: rx(r"\[([^\]]+)\]\(bts\|([^|]+)\|([01])\)"),
            block: None,
        },
        Rule {
            kind: RuleKind::Separator,
            start: rx(r"\[#Separator#([12])\]"),
            block: None,
        },
    ]
});

impl Block {
    /// Locate the end marker closing an opener that ends at `from`.
    /// Returns `(body_end, match_end)`.
    ///
    /// Same-kind openers inside the body are balanced against end markers.
    /// Unbalanced input falls back to the nearest end marker.
    fn close(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        let mut depth = 1usize;
        let mut pos = from;
        while let Some(end) = self.end.find_at(text, pos) {
            if let Some(open) = self.nest.find_at(text, pos) {
                if open.start() < end.start() {
                    depth += 1;
                    pos = open.end();
                    continue;
                }
            }
            depth -= 1;
            if depth == 0 {
                return Some((end.start(), end.end()));
            }
            pos = end.end();
        }
        self.end.find_at(text, from).map(|m| (m.start(), m.end()))
    }
}

struct Hit<'t> {
    kind: RuleKind,
    start: usize,
    end: usize,
    caps: Captures<'t>,
    body: &'t str,
}

impl Rule {
    fn find<'t>(&self, text: &'t str) -> Option<Hit<'t>> {
        let caps = self.start.captures(text)?;
        let whole = caps.get(0)?;
        let (start, open_end) = (whole.start(), whole.end());
        let (body, end) = match &self.block {
            None => ("", open_end),
            Some(block) => {
                let (body_end, end) = block.close(text, open_end)?;
                (&text[open_end..body_end], end)
            }
        };
        Some(Hit {
            kind: self.kind,
            start,
            end,
            caps,
            body,
        })
    }
}

/// Parse markup text into a node list.
///
/// Never fails: anything no rule recognises is kept as text.
pub fn parse(text: &str) -> Vec<MarkupNode> {
    parse_in(text, false)
}

fn parse_in(text: &str, in_action_row: bool) -> Vec<MarkupNode> {
    let mut nodes = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        // min_by_key keeps the first of equal keys, i.e. the higher priority rule.
        let best = RULES
            .iter()
            .filter_map(|rule| rule.find(rest))
            .min_by_key(|hit| hit.start);

        let Some(hit) = best else {
            nodes.push(MarkupNode::Text(rest.to_string()));
            break;
        };

        let pre = rest[..hit.start].trim();
        if !pre.is_empty() {
            nodes.push(MarkupNode::Text(pre.to_string()));
        }
        let next = hit.end;
        nodes.push(build(hit, in_action_row));
        rest = rest[next..].trim();
    }

    nodes
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn flag(caps: &Captures<'_>, i: usize) -> bool {
    group(caps, i) == "1"
}

fn digit(caps: &Captures<'_>, i: usize) -> u8 {
    group(caps, i).parse().unwrap_or(1)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn build(hit: Hit<'_>, in_action_row: bool) -> MarkupNode {
    let caps = &hit.caps;
    match hit.kind {
        RuleKind::Container => MarkupNode::Container(parse_in(hit.body, false)),
        RuleKind::ActionRow => MarkupNode::ActionRow(parse_in(hit.body, true)),
        RuleKind::MediaGallery => {
            let mut items = Vec::new();
            for node in parse_in(hit.body, false) {
                match node {
                    MarkupNode::MediaGallery(found) => items.extend(found),
                    other => tracing::debug!(?other, "dropping non-media node inside gallery"),
                }
            }
            MarkupNode::MediaGallery(items)
        }
        RuleKind::SectionThumbnail => MarkupNode::Section(Section {
            accessory: Accessory::Thumbnail(Thumbnail {
                description: non_empty(group(caps, 1)),
                url: group(caps, 2).to_string(),
                spoiler: flag(caps, 3),
            }),
            children: parse_in(hit.body, false),
        }),
        RuleKind::SectionButtonLink => MarkupNode::Section(Section {
            accessory: Accessory::Link(ButtonLink {
                label: group(caps, 1).to_string(),
                url: group(caps, 2).to_string(),
            }),
            children: parse_in(hit.body, false),
        }),
        RuleKind::SectionButton => MarkupNode::Section(Section {
            accessory: Accessory::Button(Button {
                label: group(caps, 1).to_string(),
                style: ButtonStyle::parse(group(caps, 2)),
                disabled: flag(caps, 3),
                id: None,
            }),
            children: parse_in(hit.body, false),
        }),
        // A gallery item on its own still needs a gallery to live in.
        RuleKind::MediaGalleryItem => MarkupNode::MediaGallery(vec![MediaItem {
            description: non_empty(group(caps, 1)),
            url: group(caps, 2).to_string(),
            spoiler: flag(caps, 3),
        }]),
        RuleKind::Select => {
            let select = MarkupNode::Select(SelectMenu {
                placeholder: group(caps, 1).to_string(),
                options: group(caps, 2).split(',').map(str::to_string).collect(),
                min_values: digit(caps, 3),
                max_values: digit(caps, 4),
                disabled: flag(caps, 5),
                id: None,
            });
            if in_action_row {
                select
            } else {
                MarkupNode::ActionRow(vec![select])
            }
        }
        RuleKind::ButtonLink => MarkupNode::ButtonLink(ButtonLink {
            label: group(caps, 1).to_string(),
            url: group(caps, 2).to_string(),
        }),
        RuleKind::Button => MarkupNode::Button(Button {
            label: group(caps, 1).to_string(),
            style: ButtonStyle::parse(group(caps, 2)),
            disabled: flag(caps, 3),
            id: None,
        }),
        RuleKind::Separator => MarkupNode::Separator(SeparatorSize::from_digit(digit(caps, 1))),
    }
}

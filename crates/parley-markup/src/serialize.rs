//! Tree → markup text.
//!
//! Block markers and inline components are each emitted on their own line.
//! Buttons carrying a style (inline or as a section accessory) are written
//! with a trailing `|id\)` segment that the parser has no rule for, so those
//! nodes come back as plain text when re-parsed. Everything else
//! round-trips through [`crate::parse`].

use crate::node::{Accessory, Button, MarkupNode, MediaItem, Section, SelectMenu};

/// Render a node list to markup text.
pub fn serialize(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn bit(b: bool) -> u8 {
    u8::from(b)
}

fn write_node(out: &mut String, node: &MarkupNode) {
    match node {
        MarkupNode::Text(content) => {
            out.push_str(content);
            out.push('\n');
        }
        MarkupNode::Container(children) => {
            out.push_str("[#Container#]\n");
            children.iter().for_each(|c| write_node(out, c));
            out.push_str("[/Container/]\n");
        }
        MarkupNode::ActionRow(children) => match children.as_slice() {
            [MarkupNode::Select(select)] => write_select(out, select),
            _ => {
                out.push_str("[#ActionRow#]\n");
                children.iter().for_each(|c| write_node(out, c));
                out.push_str("[/ActionRow/]\n");
            }
        },
        MarkupNode::MediaGallery(items) => {
            out.push_str("[#MediaGallery#]\n");
            items.iter().for_each(|i| write_media_item(out, i));
            out.push_str("[/MediaGallery/]\n");
        }
        MarkupNode::Section(section) => write_section(out, section),
        MarkupNode::Select(select) => write_select(out, select),
        MarkupNode::Button(button) => {
            write_button(out, "", button);
            out.push('\n');
        }
        MarkupNode::ButtonLink(link) => {
            out.push_str(&format!("[{}](btu|{})\n", link.label, link.url));
        }
        MarkupNode::Separator(size) => {
            out.push_str(&format!("[#Separator#{}]\n", size.value()));
        }
    }
}

fn write_media_item(out: &mut String, item: &MediaItem) {
    out.push_str(&format!(
        "[{}](media|{}|{})\n",
        item.description.as_deref().unwrap_or(""),
        item.url,
        bit(item.spoiler)
    ));
}

fn write_select(out: &mut String, select: &SelectMenu) {
    out.push_str(&format!(
        "[{}](st|{}|{}|{}|{})\n",
        select.placeholder,
        select.options.join(","),
        select.min_values,
        select.max_values,
        bit(select.disabled)
    ));
}

fn write_button(out: &mut String, prefix: &str, button: &Button) {
    out.push_str(&format!(
        "[{}{}](bts|{}|{}|{}\\)",
        prefix,
        button.label,
        button.style,
        bit(button.disabled),
        button.id.as_deref().unwrap_or("")
    ));
}

fn write_section(out: &mut String, section: &Section) {
    match &section.accessory {
        Accessory::Thumbnail(thumb) => {
            out.push_str(&format!(
                "[#SectionThumbnail#{}](thn|{}|{})\n",
                thumb.description.as_deref().unwrap_or(""),
                thumb.url,
                bit(thumb.spoiler)
            ));
        }
        Accessory::Link(link) => {
            out.push_str(&format!("[#SectionButton#{}](btu|{})\n", link.label, link.url));
        }
        Accessory::Button(button) => {
            write_button(out, "#SectionButton#", button);
            out.push('\n');
        }
    }
    section.children.iter().for_each(|c| write_node(out, c));
    out.push_str("[/Section/]\n");
}

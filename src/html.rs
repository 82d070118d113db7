use crate::error::TypeflowError;
use crate::flow::{BlockSettings, TextBlock};
use crate::style::StyleSet;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

const BLOCK_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "blockquote",
    "pre",
    "div",
    "ul",
    "ol",
];

fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Parses an HTML fragment into styled text blocks in document order.
/// Nested containers push their settings onto the inheritance stack, so
/// a blockquote's indent applies to the paragraphs inside it.
pub(crate) fn fragment_to_blocks(
    html: &str,
    styles: &StyleSet,
) -> Result<Vec<TextBlock>, TypeflowError> {
    let document = kuchiki::parse_html().one(html);
    let root = match document.select_first("body") {
        Ok(body) => body.as_node().clone(),
        Err(()) => document,
    };
    let mut blocks = Vec::new();
    collect_blocks(&root, styles, BlockSettings::default(), &mut blocks);
    Ok(blocks)
}

fn collect_blocks(
    node: &NodeRef,
    styles: &StyleSet,
    inherited: BlockSettings,
    out: &mut Vec<TextBlock>,
) {
    let mut stray_text = String::new();
    for child in node.children() {
        match child.data() {
            NodeData::Element(element) => {
                let tag = element.name.local.as_ref().to_ascii_lowercase();
                if !is_block_tag(&tag) {
                    // Inline content counts toward the surrounding block.
                    push_normalized(&mut stray_text, &child.text_contents());
                    continue;
                }
                flush_stray(&mut stray_text, inherited, out);
                let settings = inherited.merge(styles.settings_for(&tag));
                if has_block_child(&child) {
                    collect_blocks(&child, styles, settings, out);
                } else {
                    let text = normalize(&child.text_contents());
                    if !text.is_empty() {
                        out.push(TextBlock { text, settings });
                    }
                }
            }
            NodeData::Text(text) => {
                push_normalized(&mut stray_text, &text.borrow());
            }
            _ => {}
        }
    }
    flush_stray(&mut stray_text, inherited, out);
}

fn has_block_child(node: &NodeRef) -> bool {
    node.children().any(|child| match child.data() {
        NodeData::Element(element) => is_block_tag(&element.name.local.as_ref().to_ascii_lowercase()),
        _ => false,
    })
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_normalized(buffer: &mut String, raw: &str) {
    let text = normalize(raw);
    if text.is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(&text);
}

fn flush_stray(buffer: &mut String, settings: BlockSettings, out: &mut Vec<TextBlock>) {
    if buffer.is_empty() {
        return;
    }
    out.push(TextBlock {
        text: std::mem::take(buffer),
        settings,
    });
}

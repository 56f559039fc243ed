//! Tree to text.
//!
//! Parsed nodes are written back from their raw source text; only modified
//! or synthesized elements are rendered from their attribute lists.

use super::tree::{Document, Element, NodeId, NodeKind};

enum Step {
    Enter(NodeId),
    Exit(NodeId),
}

pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    let mut stack: Vec<Step> = doc
        .node(doc.root())
        .children()
        .iter()
        .rev()
        .map(|&id| Step::Enter(id))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(id) => {
                let node = doc.node(id);
                match &node.kind {
                    NodeKind::Document => {}
                    NodeKind::Doctype(raw) | NodeKind::Comment(raw) | NodeKind::Text(raw) => {
                        out.push_str(raw);
                    }
                    NodeKind::Element(element) => {
                        match element.raw_start() {
                            Some(raw) => out.push_str(raw),
                            None => render_start_tag(element, &mut out),
                        }
                        stack.push(Step::Exit(id));
                        stack.extend(node.children().iter().rev().map(|&child| Step::Enter(child)));
                    }
                }
            }
            Step::Exit(id) => {
                if let Some(element) = doc.element(id) {
                    write_end_tag(element, &mut out);
                }
            }
        }
    }

    out
}

/// Writes `<name attr="value" ...>` with values escaped for double quotes.
pub fn render_start_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for attribute in element.attributes() {
        out.push(' ');
        out.push_str(&attribute.name);
        if let Some(value) = &attribute.value {
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
    }
    if element.is_self_closing() {
        out.push_str(" /");
    }
    out.push('>');
}

fn write_end_tag(element: &Element, out: &mut String) {
    if let Some(raw) = element.raw_end() {
        out.push_str(raw);
    } else if element.is_synthesized() && !element.is_void() {
        out.push_str("</");
        out.push_str(&element.name);
        out.push('>');
    }
}

pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

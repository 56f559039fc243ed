//! Lenient HTML tokenizer and tree builder.
//!
//! Builds a [`Document`] while keeping the original text of every construct.
//! Mis-nested and stray end tags are tolerated: an end tag closes the nearest
//! open element with the same name, and an end tag matching nothing is kept
//! verbatim as text. Hard failures are limited to an empty document and
//! constructs left unterminated at end of input.

use super::tree::{Attribute, Document, Element, NodeId, NodeKind, is_void_element};
use crate::error::TrackingError;

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Parses `input` into a [`Document`].
///
/// # Errors
///
/// Returns [`TrackingError::HtmlParse`] if the document is empty or ends
/// inside a comment, declaration, tag, or quoted attribute value.
pub fn parse(input: &str) -> Result<Document, TrackingError> {
    if input.trim().is_empty() {
        return Err(TrackingError::html_parse("document is empty"));
    }

    Parser::new(input).run()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    doc: Document,
    stack: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let doc = Document::new();
        let root = doc.root();
        Self {
            input,
            pos: 0,
            doc,
            stack: vec![root],
        }
    }

    fn run(mut self) -> Result<Document, TrackingError> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];

            if rest.starts_with("<!--") {
                self.comment()?;
            } else if rest.starts_with("</") && byte_is_alpha(rest, 2) {
                self.end_tag()?;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.declaration()?;
            } else if rest.starts_with('<') && byte_is_alpha(rest, 1) {
                self.start_tag()?;
            } else {
                self.text();
            }
        }

        Ok(self.doc)
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = self.doc.create(kind);
        let parent = self.current();
        self.doc.append_child(parent, id);
        id
    }

    fn text(&mut self) {
        let input = self.input;
        let start = self.pos;
        // A '<' that starts no construct is plain text.
        let from = if input.as_bytes()[start] == b'<' {
            start + 1
        } else {
            start
        };
        let end = input[from..].find('<').map_or(input.len(), |i| from + i);

        self.push(NodeKind::Text(input[start..end].to_string()));
        self.pos = end;
    }

    fn comment(&mut self) -> Result<(), TrackingError> {
        let input = self.input;
        let start = self.pos;
        let end = input[start + 4..]
            .find("-->")
            .map(|i| start + 4 + i + 3)
            .ok_or_else(|| {
                TrackingError::html_parse(format!("unterminated comment at byte {start}"))
            })?;

        self.push(NodeKind::Comment(input[start..end].to_string()));
        self.pos = end;
        Ok(())
    }

    fn declaration(&mut self) -> Result<(), TrackingError> {
        let input = self.input;
        let start = self.pos;
        let end = input[start + 2..]
            .find('>')
            .map(|i| start + 2 + i + 1)
            .ok_or_else(|| {
                TrackingError::html_parse(format!("unterminated declaration at byte {start}"))
            })?;

        let raw = input[start..end].to_string();
        let is_doctype = raw
            .get(..9)
            .is_some_and(|head| head.eq_ignore_ascii_case("<!doctype"));

        self.push(if is_doctype {
            NodeKind::Doctype(raw)
        } else {
            NodeKind::Comment(raw)
        });
        self.pos = end;
        Ok(())
    }

    fn end_tag(&mut self) -> Result<(), TrackingError> {
        let input = self.input;
        let start = self.pos;
        let end = input[start..]
            .find('>')
            .map(|i| start + i + 1)
            .ok_or_else(|| {
                TrackingError::html_parse(format!("unterminated end tag at byte {start}"))
            })?;

        let raw = &input[start..end];
        let name = tag_name(&raw[2..]);
        self.pos = end;

        match self.open_depth(&name) {
            Some(depth) => {
                let id = self.stack[depth];
                if let Some(element) = self.doc.element_mut(id) {
                    element.set_raw_end(raw.to_string());
                }
                self.stack.truncate(depth);
            }
            None => {
                self.push(NodeKind::Text(raw.to_string()));
            }
        }

        Ok(())
    }

    fn start_tag(&mut self) -> Result<(), TrackingError> {
        let input = self.input;
        let bytes = input.as_bytes();
        let len = bytes.len();
        let start = self.pos;

        let name = tag_name(&input[start + 1..]);
        let mut i = start + 1 + name.len();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        let unterminated =
            || TrackingError::html_parse(format!("unterminated <{name}> tag at byte {start}"));

        loop {
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= len {
                return Err(unterminated());
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    if bytes.get(i + 1) == Some(&b'>') {
                        self_closing = true;
                        i += 2;
                        break;
                    }
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            if bytes[i] == b'=' {
                i += 1;
            }
            while i < len && !is_attribute_name_delimiter(bytes[i]) {
                i += 1;
            }
            let attribute_name = &input[name_start..i];

            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < len && bytes[i] == b'=' {
                i += 1;
                while i < len && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                if i >= len {
                    return Err(unterminated());
                }

                let value = match bytes[i] {
                    quote @ (b'"' | b'\'') => {
                        let close = input[i + 1..].find(quote as char).ok_or_else(|| {
                            TrackingError::html_parse(format!(
                                "unterminated attribute value in <{name}> at byte {i}"
                            ))
                        })?;
                        let value = &input[i + 1..i + 1 + close];
                        i += close + 2;
                        value
                    }
                    _ => {
                        let value_start = i;
                        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                            i += 1;
                        }
                        &input[value_start..i]
                    }
                };

                attributes.push(Attribute {
                    name: attribute_name.to_string(),
                    value: Some(decode_entities(value)),
                });
            } else {
                attributes.push(Attribute {
                    name: attribute_name.to_string(),
                    value: None,
                });
            }
        }

        let raw = input[start..i].to_string();
        self.pos = i;

        let is_raw_text = !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str());
        self.open_element(name.clone(), attributes, raw, self_closing);
        if is_raw_text {
            self.raw_text(&name);
        }

        Ok(())
    }

    fn open_element(
        &mut self,
        name: String,
        attributes: Vec<Attribute>,
        raw: String,
        self_closing: bool,
    ) {
        // <body> implicitly closes an open <head>
        if name == "body"
            && let Some(depth) = self.open_depth("head")
        {
            self.stack.truncate(depth);
        }

        let keeps_open = !self_closing && !is_void_element(&name);
        let id = self.push(NodeKind::Element(Element::parsed(
            name,
            attributes,
            raw,
            self_closing,
        )));
        if keeps_open {
            self.stack.push(id);
        }
    }

    fn raw_text(&mut self, name: &str) {
        let input = self.input;
        let closing = format!("</{name}");

        // `</scripts>` inside a script does not end it
        let mut from = self.pos;
        let end = loop {
            let Some(i) = find_ignore_ascii_case(&input[from..], &closing) else {
                break input.len();
            };
            let after = from + i + closing.len();
            if input
                .as_bytes()
                .get(after)
                .is_none_or(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
            {
                break from + i;
            }
            from = after;
        };

        if end > self.pos {
            self.push(NodeKind::Text(input[self.pos..end].to_string()));
        }
        self.pos = end;
    }

    /// Stack index of the innermost open element named `name`.
    fn open_depth(&self, name: &str) -> Option<usize> {
        self.stack
            .iter()
            .rposition(|&id| self.doc.element(id).is_some_and(|e| e.name == name))
    }
}

fn byte_is_alpha(s: &str, index: usize) -> bool {
    s.as_bytes()
        .get(index)
        .is_some_and(|b| b.is_ascii_alphabetic())
}

/// Lowercased tag name at the start of `s`.
fn tag_name(s: &str) -> String {
    let end = s
        .bytes()
        .position(|b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
        .unwrap_or(s.len());
    s[..end].to_ascii_lowercase()
}

fn is_attribute_name_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/')
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    if n.len() > h.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Decodes character references in an attribute value. Unknown named
/// references are left as written.
pub fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_entity(tail) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    out
}

fn decode_entity(s: &str) -> Option<(char, usize)> {
    let semi = s.find(';')?;
    if semi > 10 {
        return None;
    }
    let body = &s[1..semi];

    let ch = match body.strip_prefix('#') {
        Some(number) => {
            let (digits, radix) = match number.strip_prefix(['x', 'X']) {
                Some(hex) => (hex, 16),
                None => (number, 10),
            };
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return None;
            }
            let code = u32::from_str_radix(digits, radix).ok()?;
            char::from_u32(code)?
        }
        None => match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            _ => return None,
        },
    };

    Some((ch, semi + 1))
}

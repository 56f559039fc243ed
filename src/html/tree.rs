//! Arena-backed HTML tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`].
//! Parsed nodes keep their original source text so that untouched parts of
//! a document serialize byte-for-byte; an element whose attributes change
//! drops its raw start tag and is re-rendered from its attribute list.

/// Index of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Name as written in the source.
    pub name: String,
    /// Entity-decoded value; `None` for a bare attribute (`<input disabled>`).
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub name: String,
    attributes: Vec<Attribute>,
    raw_start: Option<String>,
    raw_end: Option<String>,
    self_closing: bool,
    synthesized: bool,
}

impl Element {
    /// A parsed element carrying its original start tag text.
    pub(crate) fn parsed(
        name: String,
        attributes: Vec<Attribute>,
        raw_start: String,
        self_closing: bool,
    ) -> Self {
        Self {
            name,
            attributes,
            raw_start: Some(raw_start),
            raw_end: None,
            self_closing,
            synthesized: false,
        }
    }

    /// A new element that is rendered from its attributes, with an end tag
    /// unless it is void.
    pub fn synthesized(name: &str, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attributes,
            raw_start: None,
            raw_end: None,
            self_closing: false,
            synthesized: true,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Decoded value of the first attribute named `name` (ASCII case-insensitive).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .and_then(|a| a.value.as_deref())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Replaces (or adds) an attribute value. The element is re-rendered on
    /// serialization from then on.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attribute) => attribute.value = Some(value),
            None => self.attributes.push(Attribute::new(name, value)),
        }
        self.raw_start = None;
    }

    pub fn raw_start(&self) -> Option<&str> {
        self.raw_start.as_deref()
    }

    pub fn raw_end(&self) -> Option<&str> {
        self.raw_end.as_deref()
    }

    pub(crate) fn set_raw_end(&mut self, raw_end: String) {
        self.raw_end = Some(raw_end);
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// Raw `<!DOCTYPE ...>` text.
    Doctype(String),
    /// Raw comment, declaration or processing-instruction text.
    Comment(String),
    /// Raw character data, entities left as written.
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An HTML document: the arena plus a root [`NodeKind::Document`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Adds a detached node to the arena.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` at `index` among `parent`'s children (clamped to the end).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Every node under `id` (excluding `id`) in depth-first document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();

        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }

        out
    }

    /// Elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &Element)> {
        self.descendants(self.root())
            .into_iter()
            .filter_map(move |id| self.element(id).map(|element| (id, element)))
    }

    /// First element named `name` in document order.
    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        self.elements()
            .find(|(_, element)| element.name == name)
            .map(|(id, _)| id)
    }

    pub fn has_doctype(&self) -> bool {
        self.nodes[0]
            .children
            .iter()
            .any(|id| matches!(self.nodes[id.0].kind, NodeKind::Doctype(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(href: &str) -> Element {
        Element::synthesized("a", vec![Attribute::new("href", href)])
    }

    #[test]
    fn test_append_and_descendants_order() {
        let mut doc = Document::new();
        let html = doc.create(NodeKind::Element(Element::synthesized("html", vec![])));
        let body = doc.create(NodeKind::Element(Element::synthesized("body", vec![])));
        let a = doc.create(NodeKind::Element(anchor("https://example.com")));
        let text = doc.create(NodeKind::Text("hi".to_string()));

        doc.append_child(doc.root(), html);
        doc.append_child(html, body);
        doc.append_child(body, a);
        doc.append_child(a, text);

        assert_eq!(doc.descendants(doc.root()), vec![html, body, a, text]);
        assert_eq!(doc.node(a).parent(), Some(body));
        assert_eq!(doc.find_element("a"), Some(a));
        assert_eq!(doc.find_element("table"), None);
    }

    #[test]
    fn test_insert_child_first_and_clamped() {
        let mut doc = Document::new();
        let body = doc.create(NodeKind::Element(Element::synthesized("body", vec![])));
        doc.append_child(doc.root(), body);

        let first = doc.create(NodeKind::Text("first".to_string()));
        let last = doc.create(NodeKind::Text("last".to_string()));
        doc.append_child(body, last);
        doc.insert_child(body, 0, first);

        let extra = doc.create(NodeKind::Text("extra".to_string()));
        doc.insert_child(body, 99, extra);

        assert_eq!(doc.node(body).children(), &[first, last, extra]);
    }

    #[test]
    fn test_set_attr_drops_raw_start() {
        let mut element = Element::parsed(
            "a".to_string(),
            vec![Attribute::new("HREF", "https://example.com")],
            "<a HREF=\"https://example.com\">".to_string(),
            false,
        );
        assert!(element.raw_start().is_some());
        assert_eq!(element.attr("href"), Some("https://example.com"));

        element.set_attr("href", "https://t.example.com/abc");

        assert!(element.raw_start().is_none());
        assert_eq!(element.attr("href"), Some("https://t.example.com/abc"));
        assert_eq!(element.attributes().len(), 1);
    }

    #[test]
    fn test_set_attr_adds_missing() {
        let mut element = Element::synthesized("img", vec![]);
        element.set_attr("src", "x.png");
        assert!(element.has_attr("SRC"));
        assert!(element.is_void());
    }

    #[test]
    fn test_has_doctype() {
        let mut doc = Document::new();
        assert!(!doc.has_doctype());

        let doctype = doc.create(NodeKind::Doctype("<!DOCTYPE html>".to_string()));
        doc.append_child(doc.root(), doctype);
        assert!(doc.has_doctype());
    }
}

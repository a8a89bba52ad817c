//! Arena-backed document tree.

use super::escape::{escape_attribute, escape_text};
use crate::error::{SessionError, SessionResult};

/// Index of a node inside a [`Document`] arena.
///
/// Ids stay valid for the lifetime of the document, including for nodes
/// that were detached by a remove operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; always at index 0 and never detached.
    Document,
    /// An element with ordered attributes.
    Element {
        /// Element name.
        name: String,
        /// Attributes as ordered name/value pairs.
        attributes: Vec<(String, String)>,
    },
    /// A text node.
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree.
///
/// Whitespace-only text between sibling nodes is dropped when parsing, so
/// documents written with indentation round-trip to the same tree. A blank
/// text that is an element's only content is kept as its value.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parses markup into a document.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the markup is not well-formed.
    pub fn parse(name: &str, xml: &str) -> SessionResult<Self> {
        let parsed = roxmltree::Document::parse(xml)
            .map_err(|e| SessionError::malformed_document(name, e.to_string()))?;

        let mut doc = Self::new();
        let root = doc.root();
        for child in parsed.root().children() {
            if let Some(id) = doc.import(child) {
                doc.append_child(root, id);
            }
        }
        Ok(doc)
    }

    /// Returns the document node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the single top-level element, if any.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// Copies a parsed node (and its subtree) into this arena, detached.
    ///
    /// Comments, processing instructions and indentation between
    /// sibling nodes are skipped and yield `None`.
    pub fn import(&mut self, node: roxmltree::Node<'_, '_>) -> Option<NodeId> {
        if node.is_element() {
            let attributes = node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect();
            let id = self.push(NodeKind::Element {
                name: node.tag_name().name().to_string(),
                attributes,
            });
            for child in node.children() {
                if let Some(child_id) = self.import(child) {
                    self.append_child(id, child_id);
                }
            }
            Some(id)
        } else if node.is_text() {
            if is_layout(node) {
                None
            } else {
                Some(self.create_text(node.text().unwrap_or_default()))
            }
        } else {
            None
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Returns true for element nodes.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Returns true for text nodes.
    #[must_use]
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    /// Returns the element name, or `None` for non-elements.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Returns the children of a node in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Returns the attributes of an element (empty for other nodes).
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets (or adds) an attribute. Returns false if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind else {
            return false;
        };
        let value = value.into();
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => attributes.push((name.to_string(), value)),
        }
        true
    }

    /// Removes an attribute. Returns true if it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind else {
            return false;
        };
        let before = attributes.len();
        attributes.retain(|(n, _)| n != name);
        attributes.len() != before
    }

    /// Renames an attribute. Returns true if it was present.
    pub fn rename_attribute(&mut self, id: NodeId, from: &str, to: &str) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind else {
            return false;
        };
        match attributes.iter_mut().find(|(n, _)| n == from) {
            Some(slot) => {
                slot.0 = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Renames an element. Returns false for non-elements.
    pub fn rename(&mut self, id: NodeId, to: &str) -> bool {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => {
                *name = to.to_string();
                true
            }
            _ => false,
        }
    }

    /// Appends a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` as the preceding sibling of `anchor`.
    ///
    /// Returns false if the anchor has no parent.
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) -> bool {
        self.insert_sibling(anchor, child, 0)
    }

    /// Inserts `child` as the following sibling of `anchor`.
    ///
    /// Returns false if the anchor has no parent.
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) -> bool {
        self.insert_sibling(anchor, child, 1)
    }

    fn insert_sibling(&mut self, anchor: NodeId, child: NodeId, offset: usize) -> bool {
        let Some(parent) = self.parent(anchor) else {
            return false;
        };
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let Some(index) = siblings.iter().position(|&c| c == anchor) else {
            return false;
        };
        siblings.insert(index + offset, child);
        self.nodes[child.0].parent = Some(parent);
        true
    }

    /// Detaches a node from its parent. Returns true if it was attached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return false;
        };
        self.nodes[parent.0].children.retain(|&c| c != id);
        true
    }

    /// Returns true if the node is reachable from the document node.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Creates a detached deep copy of a node.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let kind = match self.kind(id) {
            NodeKind::Document => NodeKind::Element {
                name: String::new(),
                attributes: Vec::new(),
            },
            other => other.clone(),
        };
        let copy = self.push(kind);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_copy(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Collects `id` and all of its descendants in document order.
    pub fn descendants_or_self(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in self.children(id) {
            self.descendants_or_self(child, out);
        }
    }

    /// Returns the concatenated text of all descendant text nodes.
    #[must_use]
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text) => text.clone(),
            _ => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in self.children(id) {
            match self.kind(child) {
                NodeKind::Text(text) => out.push_str(text),
                _ => self.collect_text(child, out),
            }
        }
    }

    /// Serialises a node compactly.
    #[must_use]
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialises the whole document with an XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_node(self.root(), &mut out);
        out.push('\n');
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

/// Returns true for whitespace-only text that sits next to other nodes.
///
/// That text is indentation and is dropped. Whitespace that is the whole
/// content of its element is a value and is kept.
pub(crate) fn is_layout(node: roxmltree::Node<'_, '_>) -> bool {
    node.is_text()
        && node.text().unwrap_or_default().trim().is_empty()
        && (node.prev_sibling().is_some() || node.next_sibling().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Document {
        Document::parse(
            "test",
            "<DMS>\n  <users>\n    <user id=\"1\"><name>alice</name></user>\n  </users>\n</DMS>",
        )
        .unwrap()
    }

    #[test]
    fn parse_drops_indentation() {
        let doc = sample();
        assert_eq!(
            doc.serialize(doc.root()),
            "<DMS><users><user id=\"1\"><name>alice</name></user></users></DMS>"
        );
    }

    #[test]
    fn lone_whitespace_is_content() {
        let doc = Document::parse("test", "<r><f>  </f><g>\n<h/>\n</g><k>\t</k></r>").unwrap();
        assert_eq!(
            doc.serialize(doc.root()),
            "<r><f>  </f><g><h/></g><k>\t</k></r>"
        );
    }

    #[test]
    fn parse_rejects_malformed_markup() {
        let result = Document::parse("broken", "<DMS><users></DMS>");
        assert!(matches!(
            result,
            Err(SessionError::MalformedDocument { ref name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn empty_elements_serialize_self_closed() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = doc.create_element("e");
        doc.set_attribute(e, "id", "1");
        let f = doc.create_element("f");
        doc.append_child(root, e);
        doc.append_child(e, f);
        assert_eq!(doc.serialize(root), "<e id=\"1\"><f/></e>");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = doc.create_element("e");
        doc.set_attribute(e, "q", "say \"hi\"");
        let t = doc.create_text("a < b & c");
        doc.append_child(root, e);
        doc.append_child(e, t);
        assert_eq!(
            doc.serialize(root),
            "<e q=\"say &quot;hi&quot;\">a &lt; b &amp; c</e>"
        );
        let reparsed = Document::parse("again", &doc.to_xml()).unwrap();
        let e = reparsed.document_element().unwrap();
        assert_eq!(reparsed.string_value(e), "a < b & c");
        assert_eq!(reparsed.attribute(e, "q"), Some("say \"hi\""));
    }

    #[test]
    fn sibling_insertion_and_detach() {
        let mut doc = Document::parse("t", "<r><b/></r>").unwrap();
        let r = doc.document_element().unwrap();
        let b = doc.children(r)[0];
        let a = doc.create_element("a");
        let c = doc.create_element("c");
        assert!(doc.insert_before(b, a));
        assert!(doc.insert_after(b, c));
        assert_eq!(doc.serialize(r), "<r><a/><b/><c/></r>");

        assert!(doc.detach(b));
        assert!(!doc.is_attached(b));
        assert_eq!(doc.serialize(r), "<r><a/><c/></r>");
        assert!(!doc.insert_before(b, a));
    }

    #[test]
    fn deep_copy_is_independent() {
        let mut doc = sample();
        let dms = doc.document_element().unwrap();
        let users = doc.children(dms)[0];
        let user = doc.children(users)[0];
        let copy = doc.deep_copy(user);
        doc.set_attribute(copy, "id", "2");
        doc.append_child(users, copy);
        assert_eq!(doc.attribute(user, "id"), Some("1"));
        assert_eq!(doc.children(users).len(), 2);
        assert_eq!(doc.string_value(users), "alicealice");
    }

    #[test]
    fn attribute_edits() {
        let mut doc = sample();
        let dms = doc.document_element().unwrap();
        assert!(doc.set_attribute(dms, "version", "1"));
        assert!(doc.rename_attribute(dms, "version", "v"));
        assert_eq!(doc.attribute(dms, "v"), Some("1"));
        assert!(doc.remove_attribute(dms, "v"));
        assert!(!doc.remove_attribute(dms, "v"));
        assert!(!doc.set_attribute(doc.root(), "x", "y"));
    }

    proptest! {
        #[test]
        fn escaped_values_survive_reparse(
            text in "[a-zA-Z0-9 <>&'\"]*[a-zA-Z0-9<>&'\"]",
            attr in "[a-zA-Z0-9 <>&'\"\t\n]*",
        ) {
            let mut doc = Document::new();
            let root = doc.root();
            let e = doc.create_element("e");
            doc.set_attribute(e, "v", attr.clone());
            let t = doc.create_text(text.clone());
            doc.append_child(root, e);
            doc.append_child(e, t);

            let reparsed = Document::parse("p", &doc.to_xml()).unwrap();
            let e = reparsed.document_element().unwrap();
            prop_assert_eq!(reparsed.string_value(e), text);
            prop_assert_eq!(reparsed.attribute(e, "v"), Some(attr.as_str()));
        }
    }
}

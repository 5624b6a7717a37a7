//! In-memory XML tree for path-based field extraction
//!
//! Raw E-utilities responses are parsed once with `quick_xml::Reader` into an
//! arena of nodes. Node ids are assigned in document order, so sorting a
//! selection by id restores document order. Field rules then query the tree
//! with [`Path`] expressions.

pub mod path;

pub use path::Path;

use std::borrow::Cow;
use std::sync::OnceLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{CorpusError, Result};

/// Index of a node inside a [`Document`]
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Parsed XML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

/// Strip inline formatting tags from XML content
///
/// Tags like `<i>`, `<sup>`, `<sub>` split a title or abstract into several
/// text nodes, and `text()` selections would lose the marked-up words.
/// Removing the tags keeps the words in the surrounding text node.
///
/// # Example
///
/// ```
/// use ncbi_corpus::xml::strip_inline_html_tags;
///
/// let xml = "<AbstractText>CO<sup>2</sup> levels</AbstractText>";
/// assert_eq!(strip_inline_html_tags(xml), "<AbstractText>CO2 levels</AbstractText>");
/// ```
pub fn strip_inline_html_tags(xml: &str) -> Cow<'_, str> {
    static INLINE_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = INLINE_TAG_REGEX.get_or_init(|| {
        Regex::new(r"</?(?:i|b|u|sup|sub|em|strong|italic|bold)>")
            .expect("Failed to compile inline tag regex")
    });

    let cleaned = re.replace_all(xml, "");
    if let Cow::Owned(_) = cleaned {
        debug!(
            original = xml.len(),
            cleaned = cleaned.len(),
            "Stripped inline HTML tags"
        );
    }
    cleaned
}

impl Document {
    /// Parse raw response bytes: UTF-8 decode, strip inline tags, build the tree
    #[instrument(skip(raw), fields(raw_size = raw.len()))]
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| CorpusError::XmlError(format!("document is not valid UTF-8: {e}")))?;
        let cleaned = strip_inline_html_tags(text);
        Self::parse(&cleaned)
    }

    /// Build the tree from an XML string
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().expand_empty_elements = true;

        let mut nodes = vec![Node {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
        }];
        let mut open: Vec<NodeId> = vec![0];

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let id = push_node(&mut nodes, &open, element_kind(e)?);
                    open.push(id);
                }
                Ok(Event::Empty(ref e)) => {
                    push_node(&mut nodes, &open, element_kind(e)?);
                }
                Ok(Event::End(_)) => {
                    if open.len() <= 1 {
                        return Err(CorpusError::XmlError(
                            "closing tag without matching opening tag".to_string(),
                        ));
                    }
                    open.pop();
                }
                Ok(Event::Text(ref e)) => {
                    // Text outside the root element is whitespace or junk
                    if open.len() > 1 {
                        let text = e
                            .unescape()
                            .map(Cow::into_owned)
                            .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                        push_node(&mut nodes, &open, NodeKind::Text(text));
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if open.len() > 1 {
                        let text = String::from_utf8_lossy(e).into_owned();
                        push_node(&mut nodes, &open, NodeKind::Text(text));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(CorpusError::XmlError(format!(
                        "error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                // Declarations, comments, processing instructions, doctype
                Ok(_) => {}
            }
        }

        if open.len() > 1 {
            let unclosed = open
                .last()
                .and_then(|id| match &nodes[*id].kind {
                    NodeKind::Element { name, .. } => Some(name.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            return Err(CorpusError::XmlError(format!(
                "unexpected end of document inside <{unclosed}>"
            )));
        }

        let document = Self { nodes };
        if document.root().is_none() {
            return Err(CorpusError::XmlError(
                "document has no root element".to_string(),
            ));
        }
        Ok(document)
    }

    /// The document node, parent of the root element
    pub fn document_node(&self) -> NodeId {
        0
    }

    /// The root element
    pub fn root(&self) -> Option<NodeId> {
        self.element_children(0).next()
    }

    /// Element children of `id`, in document order
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|child| matches!(self.nodes[*child].kind, NodeKind::Element { .. }))
    }

    /// Top-level record elements: the element children of the root
    pub fn records(&self) -> Vec<NodeId> {
        match self.root() {
            Some(root) => self.element_children(root).collect(),
            None => Vec::new(),
        }
    }

    /// Element name, `None` for text and document nodes
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attribute value on an element
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Text of a node: the content of a text node, or the concatenated direct
    /// text children of an element
    pub fn text(&self, id: NodeId) -> Cow<'_, str> {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => Cow::Borrowed(text),
            NodeKind::Element { .. } | NodeKind::Document => {
                let mut parts = self.nodes[id]
                    .children
                    .iter()
                    .filter_map(|child| match &self.nodes[*child].kind {
                        NodeKind::Text(text) => Some(text.as_str()),
                        _ => None,
                    });
                match (parts.next(), parts.next()) {
                    (None, _) => Cow::Borrowed(""),
                    (Some(only), None) => Cow::Borrowed(only),
                    (Some(first), Some(second)) => {
                        let mut joined = String::from(first);
                        joined.push_str(second);
                        parts.for_each(|p| joined.push_str(p));
                        Cow::Owned(joined)
                    }
                }
            }
        }
    }

    /// Evaluate `path` with `context` as the context node
    pub fn select(&self, context: NodeId, path: &Path) -> Vec<NodeId> {
        path.evaluate(self, context)
    }

    /// First node selected by `path`
    pub fn select_first(&self, context: NodeId, path: &Path) -> Option<NodeId> {
        self.select(context, path).into_iter().next()
    }

    /// Text of every selected node, in document order
    pub fn texts(&self, context: NodeId, path: &Path) -> Vec<String> {
        self.select(context, path)
            .into_iter()
            .map(|id| self.text(id).into_owned())
            .collect()
    }

    /// Text of every selected node joined by `separator`; empty when nothing matches
    pub fn joined(&self, context: NodeId, path: &Path, separator: &str) -> String {
        self.texts(context, path).join(separator)
    }

    /// Trimmed text of the first selected node, `None` when absent or blank
    pub fn first_text(&self, context: NodeId, path: &Path) -> Option<String> {
        self.select_first(context, path)
            .map(|id| self.text(id).trim().to_string())
            .filter(|text| !text.is_empty())
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

fn push_node(nodes: &mut Vec<Node>, open: &[NodeId], kind: NodeKind) -> NodeId {
    let id = nodes.len();
    let parent = open.last().copied().unwrap_or(0);
    nodes.push(Node {
        kind,
        parent: Some(parent),
        children: Vec::new(),
    });
    nodes[parent].children.push(id);
    id
}

fn element_kind(e: &BytesStart) -> Result<NodeKind> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            CorpusError::XmlError(format!("malformed attribute on <{name}>: {err}"))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        attributes.push((key, value));
    }
    Ok(NodeKind::Element { name, attributes })
}

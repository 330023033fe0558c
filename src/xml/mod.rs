//! Generic XML tree
//!
//! Parses a text blob into an arena of nodes. Each node exposes its kind,
//! local name, namespace URI, ordered attributes and its first-child,
//! next-sibling and parent links. Elements also remember the exact span of
//! source text they were parsed from, which is how `<math>` fragments are
//! captured verbatim.

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use thiserror::Error;

/// Namespace of the modelling format
pub const CELLML_2_0_NS: &str = "http://www.cellml.org/cellml/2.0#";

/// MathML namespace
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// XLink namespace, used by import `href` attributes
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Error type for XML tree construction
#[derive(Debug, Clone, Error, PartialEq)]
pub enum XmlError {
    #[error("XML parsing error at position {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("Unclosed element '{0}' at end of document")]
    Unclosed(String),
    #[error("Document has no root element")]
    NoRoot,
}

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlNodeKind {
    Element,
    Text,
    Comment,
}

/// An attribute in document order
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: XmlNodeKind,
    name: String,
    namespace: Option<String>,
    attributes: Vec<XmlAttribute>,
    text: String,
    parent: Option<usize>,
    first_child: Option<usize>,
    last_child: Option<usize>,
    next_sibling: Option<usize>,
    span: (usize, usize),
}

/// Parsed XML document
#[derive(Debug, Clone)]
pub struct XmlDocument {
    source: String,
    nodes: Vec<NodeData>,
    top_level: Vec<usize>,
}

impl XmlDocument {
    /// Parse `text` into a tree. Several top-level elements are allowed so
    /// that concatenated math fragments can be read back in one pass.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = NsReader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut doc = XmlDocument {
            source: text.to_string(),
            nodes: Vec::new(),
            top_level: Vec::new(),
        };
        let mut open: Vec<usize> = Vec::new();

        loop {
            let start = reader.buffer_position() as usize;
            let (namespace, event) = match reader.read_resolved_event() {
                Ok((ns, event)) => (namespace_uri(&ns), event),
                Err(e) => {
                    return Err(XmlError::Syntax {
                        position: reader.error_position() as u64,
                        message: e.to_string(),
                    });
                }
            };
            match event {
                Event::Start(e) => {
                    let index =
                        doc.push_element(&reader, namespace, &e, open.last().copied(), start)?;
                    open.push(index);
                }
                Event::Empty(e) => {
                    let index =
                        doc.push_element(&reader, namespace, &e, open.last().copied(), start)?;
                    doc.nodes[index].span.1 = reader.buffer_position() as usize;
                }
                Event::End(_) => {
                    if let Some(index) = open.pop() {
                        doc.nodes[index].span.1 = reader.buffer_position() as usize;
                    }
                }
                Event::Text(e) => {
                    let value = e.unescape().map_err(|err| XmlError::Syntax {
                        position: start as u64,
                        message: err.to_string(),
                    })?;
                    if !open.is_empty() {
                        doc.push_leaf(XmlNodeKind::Text, value.into_owned(), open.last().copied());
                    }
                }
                Event::CData(e) => {
                    let value = String::from_utf8_lossy(&e).into_owned();
                    doc.push_leaf(XmlNodeKind::Text, value, open.last().copied());
                }
                Event::Comment(e) => {
                    let value = String::from_utf8_lossy(&e).into_owned();
                    doc.push_leaf(XmlNodeKind::Comment, value, open.last().copied());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(&index) = open.last() {
            return Err(XmlError::Unclosed(doc.nodes[index].name.clone()));
        }
        if !doc.nodes.iter().any(|n| n.kind == XmlNodeKind::Element) {
            return Err(XmlError::NoRoot);
        }
        Ok(doc)
    }

    fn push_element(
        &mut self,
        reader: &NsReader<&[u8]>,
        namespace: Option<String>,
        e: &BytesStart,
        parent: Option<usize>,
        start: usize,
    ) -> Result<usize, XmlError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in e.attributes().flatten() {
            let key = attr.key;
            if key.as_ref() == b"xmlns" || key.as_ref().starts_with(b"xmlns:") {
                continue;
            }
            let (attr_ns, local) = reader.resolve_attribute(key);
            let value = attr.unescape_value().map_err(|err| XmlError::Syntax {
                position: start as u64,
                message: err.to_string(),
            })?;
            attributes.push(XmlAttribute {
                name: String::from_utf8_lossy(local.as_ref()).into_owned(),
                value: value.into_owned(),
                namespace: namespace_uri(&attr_ns),
            });
        }

        let index = self.push_node(NodeData {
            kind: XmlNodeKind::Element,
            name,
            namespace,
            attributes,
            text: String::new(),
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            span: (start, start),
        });
        Ok(index)
    }

    fn push_leaf(&mut self, kind: XmlNodeKind, text: String, parent: Option<usize>) {
        self.push_node(NodeData {
            kind,
            name: String::new(),
            namespace: None,
            attributes: Vec::new(),
            text,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            span: (0, 0),
        });
    }

    fn push_node(&mut self, data: NodeData) -> usize {
        let index = self.nodes.len();
        let parent = data.parent;
        self.nodes.push(data);
        match parent {
            Some(p) => {
                match self.nodes[p].last_child {
                    Some(last) => self.nodes[last].next_sibling = Some(index),
                    None => self.nodes[p].first_child = Some(index),
                }
                self.nodes[p].last_child = Some(index);
            }
            None => {
                if let Some(&last) = self.top_level.last() {
                    self.nodes[last].next_sibling = Some(index);
                }
                self.top_level.push(index);
            }
        }
        index
    }

    /// First top-level element
    pub fn root(&self) -> Option<XmlNode<'_>> {
        self.top_level
            .iter()
            .map(|&index| XmlNode { doc: self, index })
            .find(|n| n.kind() == XmlNodeKind::Element)
    }

    /// All top-level nodes in document order
    pub fn top_level(&self) -> impl Iterator<Item = XmlNode<'_>> {
        self.top_level.iter().map(|&index| XmlNode { doc: self, index })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn namespace_uri(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        _ => None,
    }
}

/// Handle to a node inside an [`XmlDocument`]
#[derive(Debug, Clone, Copy)]
pub struct XmlNode<'a> {
    doc: &'a XmlDocument,
    index: usize,
}

impl<'a> XmlNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.index]
    }

    fn at(&self, index: Option<usize>) -> Option<XmlNode<'a>> {
        index.map(|index| XmlNode {
            doc: self.doc,
            index,
        })
    }

    pub fn kind(&self) -> XmlNodeKind {
        self.data().kind
    }

    /// Local name of an element, empty for text and comments
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.data().namespace.as_deref()
    }

    pub fn attributes(&self) -> &'a [XmlAttribute] {
        &self.data().attributes
    }

    /// Value of the first attribute with this local name
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data()
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn first_child(&self) -> Option<XmlNode<'a>> {
        self.at(self.data().first_child)
    }

    pub fn next_sibling(&self) -> Option<XmlNode<'a>> {
        self.at(self.data().next_sibling)
    }

    pub fn parent(&self) -> Option<XmlNode<'a>> {
        self.at(self.data().parent)
    }

    pub fn is_element(&self, name: &str) -> bool {
        self.kind() == XmlNodeKind::Element && self.name() == name
    }

    /// Text of a text or comment node
    pub fn value(&self) -> &'a str {
        &self.data().text
    }

    pub fn children(&self) -> Children<'a> {
        Children {
            next: self.first_child(),
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = XmlNode<'a>> + use<'a> {
        self.children().filter(|c| c.kind() == XmlNodeKind::Element)
    }

    /// Every node below this one, in document order
    pub fn descendants(&self) -> Vec<XmlNode<'a>> {
        let mut found = Vec::new();
        let mut stack: Vec<XmlNode<'a>> = self.children().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            found.push(node);
            let mut children: Vec<XmlNode<'a>> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        found
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children()
            .filter(|c| c.kind() == XmlNodeKind::Text)
            .map(|c| c.value())
            .collect()
    }

    /// Byte range of this element in the parsed text
    pub fn span(&self) -> (usize, usize) {
        self.data().span
    }

    /// Exact source text this element was parsed from
    pub fn source(&self) -> &'a str {
        let (start, end) = self.data().span;
        self.doc.source.get(start..end).unwrap_or("")
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    next: Option<XmlNode<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = XmlNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next_sibling();
        Some(current)
    }
}

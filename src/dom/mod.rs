//! Read-only DOM for rendered diploma pages.
//!
//! The renderer hands back a tree of [`Node`]s. Pages are the element
//! children of the element whose `id` is `page-container`; each one is
//! exposed as a [`PageNode`], in document order.

mod html;

pub use html::parse_html;

use crate::error::{Error, ErrorKind, Result};

/// Id of the element holding one child element per page.
pub const PAGE_CONTAINER_ID: &str = "page-container";

/// A DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }
}

/// An element with its attributes and child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element. Tag names are stored lowercase.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text.into());
        self
    }

    pub(crate) fn push_child(&mut self, node: Node) {
        match node {
            Node::Text(text) => self.push_text(text),
            element => self.children.push(element),
        }
    }

    /// Adjacent text is merged into one node.
    fn push_text(&mut self, text: String) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(Node::Text(text));
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Direct child nodes, text included.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// This element and every element below it, in pre-order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element (this one included) whose `id` is `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.descendants().find(|e| e.id() == Some(id))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// Pre-order iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.child_elements().collect::<Vec<_>>().into_iter().rev());
        Some(next)
    }
}

/// A rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.root.find_by_id(id)
    }

    /// The pages of the document: element children of the page container.
    pub fn pages(&self) -> Result<Vec<PageNode<'_>>> {
        let container = self.find_by_id(PAGE_CONTAINER_ID).ok_or_else(|| {
            Error::new("find pages", ErrorKind::PageContainerNotFound)
        })?;
        Ok(container
            .child_elements()
            .enumerate()
            .map(|(index, element)| PageNode { index, element })
            .collect())
    }
}

/// One logical diploma page.
#[derive(Debug, Clone, Copy)]
pub struct PageNode<'a> {
    index: usize,
    element: &'a Element,
}

impl<'a> PageNode<'a> {
    pub fn new(index: usize, element: &'a Element) -> Self {
        Self { index, element }
    }

    /// Position of the page in the document, from 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }
}

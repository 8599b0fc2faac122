//! The capabilities the editing operations need from a document tree.

use crate::document::{Document, Node};
use crate::element::Element;
use crate::error::Result;
use crate::xpath::XPath;
use std::fmt::Debug;

/// A mutable XML element tree addressed by copyable node handles.
///
/// The functions in [`crate::editor`] and [`crate::flatten`] only talk to a
/// tree through this trait. [`Document`] implements it.
pub trait XmlTree {
    type Node: Copy + Eq + Debug;

    fn node_name(&self, node: Self::Node) -> &str;

    /// Text and CDATA directly under `node`, concatenated, untrimmed.
    fn direct_text(&self, node: Self::Node) -> String;

    /// Attributes in document order.
    fn attribute_pairs(&self, node: Self::Node) -> Vec<(String, String)>;

    /// Direct child elements in document order.
    fn child_nodes(&self, node: Self::Node) -> Vec<Self::Node>;

    fn parent_node(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether `node` is the top of its tree and cannot be detached.
    fn is_root(&self, node: Self::Node) -> bool;

    /// Append a new element `name` to `parent`, holding `text` if given.
    fn create_child(
        &mut self,
        parent: Self::Node,
        name: &str,
        text: Option<&str>,
    ) -> Result<Self::Node>;

    fn create_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> Result<()>;

    /// Append a CDATA section to `node`.
    fn create_cdata(&mut self, node: Self::Node, value: &str) -> Result<()>;

    fn remove_child(&mut self, parent: Self::Node, child: Self::Node) -> Result<()>;

    /// Elements matched by the path query `path` from `context`, in document order.
    fn query(&self, context: Self::Node, path: &str) -> Result<Vec<Self::Node>>;
}

impl XmlTree for Document {
    type Node = Element;

    fn node_name(&self, node: Element) -> &str {
        node.name(self)
    }

    fn direct_text(&self, node: Element) -> String {
        node.text(self)
    }

    fn attribute_pairs(&self, node: Element) -> Vec<(String, String)> {
        node.attributes(self)
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn child_nodes(&self, node: Element) -> Vec<Element> {
        node.child_elements(self)
    }

    fn parent_node(&self, node: Element) -> Option<Element> {
        node.parent(self)
    }

    fn is_root(&self, node: Element) -> bool {
        node.is_container() || node.is_root(self)
    }

    fn create_child(&mut self, parent: Element, name: &str, text: Option<&str>) -> Result<Element> {
        parent.add_child(self, name, text)
    }

    fn create_attribute(&mut self, node: Element, name: &str, value: &str) -> Result<()> {
        node.set_attribute(self, name, value)
    }

    fn create_cdata(&mut self, node: Element, value: &str) -> Result<()> {
        node.push_child(self, Node::CData(value.to_string()))
    }

    fn remove_child(&mut self, parent: Element, child: Element) -> Result<()> {
        parent.remove_child_elem(self, child)
    }

    fn query(&self, context: Element, path: &str) -> Result<Vec<Element>> {
        XPath::compile(path)?.select(self, context)
    }
}

use crate::document::{Document, Node};
use crate::error::{Error, Result};
use indexmap::IndexMap;

#[derive(Debug)]
pub(crate) struct ElementData {
    name: String,
    attributes: IndexMap<String, String>, // q:attr="val" => {"q:attr": "val"}
    parent: Option<Element>,
    children: Vec<Node>,
}

/// Represents an Xml Element.
///
/// This struct only contains a unique usize id and implements trait `Copy`.
/// So you do not need to bother with having a reference.
///
/// Because the actual data of the element is stored in [`Document`],
/// most methods takes `&Document` or `&mut Document` as its first argument.
///
/// A handle is only meaningful for the document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element {
    id: usize,
}

impl Element {
    /// Create a new empty element with name. The element has no parent
    /// until it is pushed to one.
    pub fn new<S: Into<String>>(document: &mut Document, name: S) -> Element {
        let elem = Element {
            id: document.store.len(),
        };
        document.store.push(ElementData {
            name: name.into(),
            attributes: IndexMap::new(),
            parent: None,
            children: vec![],
        });
        elem
    }

    pub(crate) fn container() -> (Element, ElementData) {
        let elem_data = ElementData {
            name: String::new(),
            attributes: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        };
        (Element { id: 0 }, elem_data)
    }

    /// The container is the hidden document node holding the root element.
    pub fn is_container(&self) -> bool {
        self.id == 0
    }

    pub fn is_root(&self, document: &Document) -> bool {
        document.root() == *self
    }
}

impl Element {
    fn data<'a>(&self, document: &'a Document) -> &'a ElementData {
        &document.store[self.id]
    }

    fn mut_data<'a>(&self, document: &'a mut Document) -> &'a mut ElementData {
        &mut document.store[self.id]
    }

    /// Raw name of element, including its namespace prefix if any.
    pub fn name<'a>(&self, document: &'a Document) -> &'a str {
        &self.data(document).name
    }

    pub fn attributes<'a>(&self, document: &'a Document) -> &'a IndexMap<String, String> {
        &self.data(document).attributes
    }

    pub fn attribute<'a>(&self, document: &'a Document, name: &str) -> Option<&'a str> {
        self.attributes(document).get(name).map(|s| s.as_str())
    }

    pub(crate) fn mut_attributes<'a>(
        &self,
        document: &'a mut Document,
    ) -> &'a mut IndexMap<String, String> {
        &mut self.mut_data(document).attributes
    }

    /// Set an attribute, replacing an existing value in place.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: `name` is empty.
    pub fn set_attribute<S: Into<String>>(
        &self,
        document: &mut Document,
        name: &str,
        value: S,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        self.mut_attributes(document)
            .insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn parent(&self, document: &Document) -> Option<Element> {
        self.data(document).parent
    }

    /// ```ignore
    /// self.parent(document).is_some()
    /// ```
    pub fn has_parent(&self, document: &Document) -> bool {
        self.parent(document).is_some()
    }

    pub fn children<'a>(&self, document: &'a Document) -> &'a Vec<Node> {
        &self.data(document).children
    }

    pub fn child_elements(&self, document: &Document) -> Vec<Element> {
        self.children(document)
            .iter()
            .filter_map(|node| node.as_element())
            .collect()
    }

    pub fn has_child_elements(&self, document: &Document) -> bool {
        self.children(document)
            .iter()
            .any(|node| node.as_element().is_some())
    }

    /// Text and CDATA directly under this element, concatenated.
    /// Text of descendant elements is not included.
    pub fn text(&self, document: &Document) -> String {
        let mut buf = String::new();
        for node in self.children(document) {
            match node {
                Node::Text(text) | Node::CData(text) => buf.push_str(text),
                _ => {}
            }
        }
        buf
    }

    /// All text and CDATA under this element in document order.
    pub fn text_content(&self, document: &Document) -> String {
        let mut buf = String::new();
        self.build_text_content(document, &mut buf);
        buf
    }

    pub(crate) fn build_text_content(&self, document: &Document, buf: &mut String) {
        for node in self.children(document) {
            match node {
                Node::Element(elem) => elem.build_text_content(document, buf),
                Node::Text(text) | Node::CData(text) => buf.push_str(text),
                _ => {}
            }
        }
    }

    /// Equivalent to `vec.push()`.
    ///
    /// # Errors
    ///
    /// - [`Error::HasAParent`]: If node is an element, it must not have a parent.
    /// Call `elem.detach()` before.
    /// - [`Error::RootCannotMove`]: The container cannot be pushed anywhere.
    pub fn push_child(&self, document: &mut Document, node: Node) -> Result<()> {
        if let Node::Element(elem) = node {
            if elem.is_container() {
                return Err(Error::RootCannotMove);
            }
            let data = elem.mut_data(document);
            if data.parent.is_some() {
                return Err(Error::HasAParent);
            }
            data.parent = Some(*self);
        }
        self.mut_data(document).children.push(node);
        Ok(())
    }

    /// Create a new element `name` as the last child, with an optional text node.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: `name` is empty.
    pub fn add_child(
        &self,
        document: &mut Document,
        name: &str,
        text: Option<&str>,
    ) -> Result<Element> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        let child = Element::new(document, name);
        if let Some(text) = text {
            child.push_child(document, Node::Text(text.to_string()))?;
        }
        self.push_child(document, Node::Element(child))?;
        Ok(child)
    }

    /// Remove child element by value.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`]: Element was not found among its children.
    pub fn remove_child_elem(&self, document: &mut Document, element: Element) -> Result<()> {
        let children = &mut self.mut_data(document).children;
        let pos = children
            .iter()
            .position(|node| node.as_element() == Some(element))
            .ok_or(Error::NotFound)?;
        children.remove(pos);
        element.mut_data(document).parent = None;
        Ok(())
    }

    /// Remove this element from its parent. Does nothing if it has no parent.
    ///
    /// # Errors
    ///
    /// - [`Error::RootCannotMove`]: The root element and the container stay in place.
    pub fn detach(&self, document: &mut Document) -> Result<()> {
        if self.is_container() || self.is_root(document) {
            return Err(Error::RootCannotMove);
        }
        match self.parent(document) {
            Some(parent) => parent.remove_child_elem(document, *self),
            None => Ok(()),
        }
    }
}

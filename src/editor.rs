//! Editing operations over any [`XmlTree`].
//!
//! # Examples
//! ```
//! use xml_element::{editor, ErrorLog};
//!
//! let mut log = ErrorLog::new();
//! let mut doc = editor::load(r#"<root><item id="1">x</item></root>"#, false, &mut log).unwrap();
//! let root = doc.root();
//! let extra = editor::append_str(&mut doc, root, "<extra>5</extra>", &mut log).unwrap();
//! assert_eq!(extra.text(&doc), "5");
//! assert_eq!(
//!     root.write_str(&doc).unwrap(),
//!     r#"<root><item id="1">x</item><extra>5</extra></root>"#
//! );
//! ```

use crate::document::Document;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::log::ErrorLog;
use crate::parser::ReadOptions;
use crate::tree::XmlTree;
use tracing::debug;

/// Sources ending with this suffix are file paths, anything else is xml text.
const FILE_SUFFIX: &str = ".xml";

fn is_file_source(source: &str) -> bool {
    source.ends_with(FILE_SUFFIX)
}

/// Strips ASCII blanks and NUL only. Other whitespace, like a
/// no-break space, counts as text.
fn trim_blank(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B'))
}

/// Load a document from xml text, or from a file if `source` ends with `.xml`.
///
/// Parse errors are reported to `log` in its current mode before being
/// returned. After a successful load the log's collection mode is set to
/// `use_errors`, which also clears it.
///
/// # Errors
///
/// - [`Error::Parse`]: The file could not be read or the xml is malformed.
pub fn load(source: &str, use_errors: bool, log: &mut ErrorLog) -> Result<Document> {
    load_with_opts(source, use_errors, ReadOptions::default(), log)
}

pub fn load_with_opts(
    source: &str,
    use_errors: bool,
    opts: ReadOptions,
    log: &mut ErrorLog,
) -> Result<Document> {
    let document = parse_source(source, opts, log)?;
    log.use_internal_errors(use_errors);
    debug!(
        from_file = is_file_source(source),
        elements = document.store.len() - 1,
        "loaded document"
    );
    Ok(document)
}

fn parse_source(source: &str, opts: ReadOptions, log: &mut ErrorLog) -> Result<Document> {
    let parsed = if is_file_source(source) {
        Document::parse_file_with_opts(source, opts)
    } else {
        Document::parse_str_with_opts(source, opts)
    };
    parsed.map_err(|err| {
        if let Error::Parse(record) = &err {
            log.report(record);
        }
        err
    })
}

/// An owned copy of the parts of an element `append` reads.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    name: String,
    value: String,
    attributes: Vec<(String, String)>,
    children: Vec<Fragment>,
}

impl Fragment {
    fn capture<T: XmlTree>(tree: &T, node: T::Node) -> Fragment {
        let value = trim_blank(&tree.direct_text(node)).to_string();
        // a node with text is copied as a leaf
        let children = if value.is_empty() {
            tree.child_nodes(node)
                .into_iter()
                .map(|child| Fragment::capture(tree, child))
                .collect()
        } else {
            Vec::new()
        };
        Fragment {
            name: tree.node_name(node).to_string(),
            value,
            attributes: tree.attribute_pairs(node),
            children,
        }
    }

    fn graft<T: XmlTree>(&self, tree: &mut T, parent: T::Node) -> Result<T::Node> {
        let node = if self.value.is_empty() {
            let node = tree.create_child(parent, &self.name, None)?;
            for child in &self.children {
                child.graft(tree, node)?;
            }
            node
        } else {
            tree.create_child(parent, &self.name, Some(&self.value))?
        };
        for (name, value) in &self.attributes {
            tree.create_attribute(node, name, value)?;
        }
        Ok(node)
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Fragment::count).sum::<usize>()
    }
}

/// Append a copy of `source` from `source_tree` as the last child of
/// `target`, returning the new child.
///
/// A source with non-blank direct text is copied as a leaf holding the
/// trimmed text, and its child elements are dropped. Otherwise each child
/// element is appended recursively. Attributes are copied in both cases.
/// `source_tree` is never modified.
pub fn append<S: XmlTree, T: XmlTree>(
    source_tree: &S,
    source: S::Node,
    target_tree: &mut T,
    target: T::Node,
) -> Result<T::Node> {
    let fragment = Fragment::capture(source_tree, source);
    graft_logged(&fragment, target_tree, target)
}

/// [`append`] with source and target in the same tree. `source` may be an
/// ancestor of `target`; it is copied before anything is added.
pub fn append_within<T: XmlTree>(tree: &mut T, source: T::Node, target: T::Node) -> Result<T::Node> {
    let fragment = Fragment::capture(tree, source);
    graft_logged(&fragment, tree, target)
}

/// [`append`] the root element of `xml`, which is xml text or a path
/// ending with `.xml`. `xml` goes through [`load`] with `use_errors` off:
/// parse errors are reported to `log` in its current mode, and a
/// successful parse switches `log` to immediate mode, clearing it.
///
/// # Errors
///
/// - [`Error::Parse`]: `xml` could not be loaded. `target` is not modified.
pub fn append_str<T: XmlTree>(
    tree: &mut T,
    target: T::Node,
    xml: &str,
    log: &mut ErrorLog,
) -> Result<T::Node> {
    let source = load(xml, false, log)?;
    let fragment = Fragment::capture(&source, source.root());
    graft_logged(&fragment, tree, target)
}

fn graft_logged<T: XmlTree>(fragment: &Fragment, tree: &mut T, target: T::Node) -> Result<T::Node> {
    let node = fragment.graft(tree, target)?;
    debug!(name = %fragment.name, elements = fragment.count(), "appended");
    Ok(node)
}

/// Detach `target` from its parent, or with a `query`, detach every
/// element it matches from `target`. Returns `target`.
///
/// Detached elements stay allocated in a [`Document`] until it is dropped.
///
/// # Errors
///
/// - [`Error::InvalidQuery`]: The query is malformed. Nothing is removed.
/// - [`Error::RootCannotMove`]: The root would be removed. Nothing is removed.
pub fn remove_node<T: XmlTree>(tree: &mut T, target: T::Node, query: Option<&str>) -> Result<T::Node> {
    let matched = match query {
        Some(query) => tree.query(target, query)?,
        None => vec![target],
    };
    if matched.iter().any(|node| tree.is_root(*node)) {
        return Err(Error::RootCannotMove);
    }
    for &node in &matched {
        if let Some(parent) = tree.parent_node(node) {
            tree.remove_child(parent, node)?;
        }
    }
    debug!(query = query.unwrap_or("."), removed = matched.len(), "removed nodes");
    Ok(target)
}

/// The `n`-th (0-based) element matched by `query` from `node`.
pub fn xpath_nth<T: XmlTree>(tree: &T, node: T::Node, query: &str, n: usize) -> Result<Option<T::Node>> {
    Ok(tree.query(node, query)?.into_iter().nth(n))
}

/// Append a CDATA section to `node`. Returns `node`.
pub fn add_cdata<T: XmlTree>(tree: &mut T, node: T::Node, value: &str) -> Result<T::Node> {
    tree.create_cdata(node, value)?;
    Ok(node)
}

/// Append a child `name` holding a single CDATA section. Returns `node`,
/// the parent, not the new child.
pub fn add_child_cdata<T: XmlTree>(
    tree: &mut T,
    node: T::Node,
    name: &str,
    value: &str,
) -> Result<T::Node> {
    let child = tree.create_child(node, name, None)?;
    tree.create_cdata(child, value)?;
    Ok(node)
}

impl Element {
    /// Append a copy of `source`, an element of the same document.
    /// See [`append`].
    pub fn append(&self, document: &mut Document, source: Element) -> Result<Element> {
        append_within(document, source, *self)
    }

    /// Append a copy of `source` from another document. See [`append`].
    pub fn append_from(
        &self,
        document: &mut Document,
        source_document: &Document,
        source: Element,
    ) -> Result<Element> {
        append(source_document, source, document, *self)
    }

    /// See [`append_str`].
    pub fn append_str(&self, document: &mut Document, xml: &str, log: &mut ErrorLog) -> Result<Element> {
        append_str(document, *self, xml, log)
    }

    /// See [`remove_node`].
    pub fn remove_node(&self, document: &mut Document, query: Option<&str>) -> Result<Element> {
        remove_node(document, *self, query)
    }

    pub fn xpath_nth(&self, document: &Document, query: &str, n: usize) -> Result<Option<Element>> {
        xpath_nth(document, *self, query, n)
    }

    pub fn add_cdata(&self, document: &mut Document, value: &str) -> Result<Element> {
        add_cdata(document, *self, value)
    }

    pub fn add_child_cdata(&self, document: &mut Document, name: &str, value: &str) -> Result<Element> {
        add_child_cdata(document, *self, name, value)
    }
}

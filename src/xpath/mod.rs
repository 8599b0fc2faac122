//! Path queries over a [`Document`].
//!
//! Supports the commonly used part of XPath 1.0: abbreviated and full
//! location paths on every axis but `namespace`, predicates, unions,
//! comparison and arithmetic operators, and the core string, number and
//! boolean functions. Variables are not supported.

mod eval;
mod lexer;
mod parser;

use crate::document::{Document, Node};
use crate::element::Element;
use crate::error::{Error, Result};
use eval::{Evaluator, Value, XNode};
use lexer::Lexer;
use parser::{Expr, Parser};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::trace;

/// A compiled path query.
///
/// # Examples
/// ```
/// use xml_element::{Document, XPath};
///
/// let doc = Document::parse_str(r#"<shelf><book id="1"/><book id="2"/></shelf>"#).unwrap();
/// let query = XPath::compile("book[@id = '2']").unwrap();
/// let found = query.select(&doc, doc.root()).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].attribute(&doc, "id"), Some("2"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    query: String,
    expr: Expr,
}

impl XPath {
    /// # Errors
    ///
    /// - [`Error::InvalidQuery`]: The query is not a valid expression.
    pub fn compile(query: &str) -> Result<XPath> {
        let tokens = Lexer::new(query)
            .tokenize()
            .map_err(|reason| Error::invalid_query(query, reason))?;
        let expr = Parser::new(tokens)
            .parse()
            .map_err(|reason| Error::invalid_query(query, reason))?;
        Ok(XPath {
            query: query.to_string(),
            expr,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// Evaluate with `context` as the context node and return the matched
    /// elements in document order. A matched text node stands for its
    /// parent element. Attributes, comments and other nodes are left out,
    /// as is the document node.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidQuery`]: The expression does not evaluate to a
    /// node-set, or a function got a non node-set where one is required.
    pub fn select(&self, document: &Document, context: Element) -> Result<Vec<Element>> {
        let evaluator = Evaluator::new(document, context);
        let value = evaluator
            .evaluate(&self.expr, context)
            .map_err(|reason| Error::invalid_query(&self.query, reason))?;
        match value {
            Value::Nodes(nodes) => {
                trace!(query = %self.query, matched = nodes.len());
                let mut seen = HashSet::new();
                let mut found = Vec::with_capacity(nodes.len());
                for node in nodes {
                    let elem = match node {
                        XNode::Element(elem) => elem,
                        XNode::Child(parent, index) => match parent.children(document).get(index) {
                            Some(Node::Text(_)) => parent,
                            _ => continue,
                        },
                        XNode::Attribute(_, _) => continue,
                    };
                    if !elem.is_container() && seen.insert(elem) {
                        found.push(elem);
                    }
                }
                Ok(found)
            }
            _ => Err(Error::invalid_query(
                &self.query,
                "expression does not select nodes",
            )),
        }
    }
}

impl FromStr for XPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<XPath> {
        XPath::compile(s)
    }
}

impl Element {
    /// All elements matched by `query` with this element as context, in
    /// document order.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidQuery`]: `query` is malformed or does not select nodes.
    pub fn xpath(&self, document: &Document, query: &str) -> Result<Vec<Element>> {
        XPath::compile(query)?.select(document, *self)
    }
}

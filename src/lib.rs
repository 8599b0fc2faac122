//! An editing layer over an in-memory XML tree.
//!
//! Load a document from text or a `.xml` file, append copies of nodes,
//! remove nodes matched by a path query, add CDATA sections and flatten a
//! subtree into nested ordered maps.
//!
//! ```
//! use xml_element::{load, ErrorLog, FlattenMode};
//!
//! let mut log = ErrorLog::new();
//! let mut doc = load("<root><a/><b><c/></b></root>", true, &mut log).unwrap();
//! let root = doc.root();
//! root.remove_node(&mut doc, Some("//c")).unwrap();
//! root.add_child_cdata(&mut doc, "note", "1 < 2").unwrap();
//!
//! let arr = root.to_array(&doc, FlattenMode::Corrected);
//! assert_eq!(arr.len(), 3);
//! assert_eq!(
//!     root.write_str(&doc).unwrap(),
//!     "<root><a/><b/><note><![CDATA[1 < 2]]></note></root>"
//! );
//! ```

mod document;
mod element;
mod error;
mod log;
mod parser;
mod tree;
mod xpath;

pub mod editor;
pub mod flatten;

pub use crate::document::{Document, Node};
pub use crate::editor::{
    add_cdata, add_child_cdata, append, append_str, append_within, load, load_with_opts,
    remove_node, xpath_nth,
};
pub use crate::element::Element;
pub use crate::error::{Error, Result};
pub use crate::flatten::{to_array, Array, FlattenMode, Key, Value};
pub use crate::log::{ErrorLevel, ErrorLog, ErrorRecord};
pub use crate::parser::ReadOptions;
pub use crate::tree::XmlTree;
pub use crate::xpath::XPath;

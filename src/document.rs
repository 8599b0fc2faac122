use crate::element::{Element, ElementData};
use crate::error::{Error, Result};
use crate::log::{ErrorLevel, ErrorRecord};
use crate::parser::{DocumentParser, ReadOptions};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// A child slot of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
    PI(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<Element> {
        match self {
            Self::Element(elem) => Some(*elem),
            _ => None,
        }
    }
}

/// Represents a XML document.
///
/// Use [`Document::parse_str()`], [`Document::parse_file()`] or
/// [`Document::parse_reader()`] to parse xml, or [`crate::load()`] to get
/// errors reported to an [`crate::ErrorLog`].
///
/// # Examples
/// ```
/// use xml_element::Document;
///
/// let doc = Document::parse_str(r#"<?xml version="1.0" encoding="UTF-8"?>
/// <package>
///     <metadata>
///         <author>Lewis Carol</author>
///     </metadata>
/// </package>
/// "#).unwrap();
/// let author = doc.root().xpath_nth(&doc, "metadata/author", 0).unwrap().unwrap();
/// assert_eq!(author.text(&doc), "Lewis Carol");
/// ```
#[derive(Debug)]
pub struct Document {
    pub(crate) store: Vec<ElementData>,
    container: Element,
    root: Element,

    pub(crate) version: String,
    pub(crate) standalone: bool,
}

impl Document {
    /// Create a new document whose root element is `root_name`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: `root_name` is empty.
    pub fn new(root_name: &str) -> Result<Document> {
        let mut document = Document::empty();
        let container = document.container();
        let root = container.add_child(&mut document, root_name, None)?;
        document.root = root;
        Ok(document)
    }

    /// A document holding only the container. The parser fills in the rest.
    pub(crate) fn empty() -> Document {
        let (container, container_data) = Element::container();
        Document {
            store: vec![container_data],
            container,
            root: container,
            version: String::from("1.0"),
            standalone: false,
        }
    }

    pub(crate) fn set_root(&mut self, root: Element) {
        self.root = root;
    }

    /// The hidden document node. Its children are the root element and any
    /// comment, processing instruction or doctype outside of it.
    pub fn container(&self) -> Element {
        self.container
    }

    /// The document element.
    pub fn root(&self) -> Element {
        self.root
    }

    pub fn root_nodes(&self) -> &Vec<Node> {
        self.container.children(self)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn standalone(&self) -> bool {
        self.standalone
    }
}

// Read
impl Document {
    /// Parses xml string.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`]: The string is not well-formed xml.
    pub fn parse_str(str: &str) -> Result<Document> {
        Self::parse_str_with_opts(str, ReadOptions::default())
    }

    pub fn parse_str_with_opts(str: &str, opts: ReadOptions) -> Result<Document> {
        DocumentParser::parse_str(str, opts)
    }

    /// Parses xml from reader. The bytes may be in any encoding announced by
    /// a byte order mark or the xml declaration.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`]: Could not read, decode or parse the input.
    pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
        Self::parse_reader_with_opts(reader, ReadOptions::default())
    }

    pub fn parse_reader_with_opts<R: Read>(mut reader: R, opts: ReadOptions) -> Result<Document> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|err| {
            Error::Parse(ErrorRecord::new(ErrorLevel::Warning, err.to_string()))
        })?;
        DocumentParser::parse_bytes(&bytes, opts)
    }

    /// Parses xml file.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`]: The file could not be read, or is not well-formed xml.
    /// The record names the file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::parse_file_with_opts(path, ReadOptions::default())
    }

    pub fn parse_file_with_opts<P: AsRef<Path>>(path: P, opts: ReadOptions) -> Result<Document> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| {
            let message = format!(
                "failed to load external entity \"{}\": {}",
                path.display(),
                err
            );
            Error::Parse(ErrorRecord::new(ErrorLevel::Warning, message).in_file(path))
        })?;
        DocumentParser::parse_bytes(&bytes, opts).map_err(|err| match err {
            Error::Parse(record) => Error::Parse(record.in_file(path)),
            err => err,
        })
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Document> {
        Document::parse_str(s)
    }
}

// Write
impl Document {
    /// Writes document as xml string, indented.
    pub fn write_str(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::with_capacity(200);
        self.write(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write document to writer. Will be written in UTF-8.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        let container = self.container();
        let mut writer = Writer::new_with_indent(writer, b' ', 4);
        self.write_decl(&mut writer)?;
        self.write_nodes(&mut writer, container.children(self))?;
        writer.write_event(Event::Eof).map_err(write_error)?;
        Ok(())
    }

    /// Write document to a file, replacing it if it exists.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let xml = self.write_str()?;
        std::fs::write(path, xml)
            .map_err(|err| Error::Io(format!("{}: {}", path.display(), err)))
    }

    /// Writes a single element and its subtree as compact xml, without declaration.
    pub fn write_element_str(&self, element: Element) -> Result<String> {
        let mut writer = Writer::new(Vec::with_capacity(100));
        self.write_element(&mut writer, element)?;
        let buf = writer.into_inner();
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn write_decl(&self, writer: &mut Writer<impl Write>) -> Result<()> {
        let standalone = match self.standalone {
            true => Some("yes".as_bytes()),
            false => None,
        };
        writer
            .write_event(Event::Decl(BytesDecl::new(
                self.version.as_bytes(),
                Some("UTF-8".as_bytes()),
                standalone,
            )))
            .map_err(write_error)?;
        Ok(())
    }

    fn write_nodes(&self, writer: &mut Writer<impl Write>, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            let event = match node {
                Node::Element(elem) => {
                    self.write_element(writer, *elem)?;
                    continue;
                }
                Node::Text(text) => Event::Text(BytesText::from_plain_str(text)),
                Node::DocType(text) => Event::DocType(BytesText::from_escaped_str(text)),
                // Comment, CData, and PI content is not escaped.
                Node::Comment(text) => Event::Comment(BytesText::from_escaped_str(text)),
                Node::CData(text) => Event::CData(BytesText::from_escaped(split_cdata(text))),
                Node::PI(text) => Event::PI(BytesText::from_escaped_str(text)),
            };
            writer.write_event(event).map_err(write_error)?;
        }
        Ok(())
    }

    fn write_element(&self, writer: &mut Writer<impl Write>, element: Element) -> Result<()> {
        let name_bytes = element.name(self).as_bytes();
        let mut start = BytesStart::borrowed_name(name_bytes);
        for (key, val) in element.attributes(self) {
            start.push_attribute((key.as_str(), val.as_str()));
        }
        if element.children(self).is_empty() {
            writer.write_event(Event::Empty(start)).map_err(write_error)?;
        } else {
            writer.write_event(Event::Start(start)).map_err(write_error)?;
            self.write_nodes(writer, element.children(self))?;
            writer
                .write_event(Event::End(BytesEnd::borrowed(name_bytes)))
                .map_err(write_error)?;
        }
        Ok(())
    }
}

/// A `]]>` inside CDATA closes the section early, so it is split across
/// two adjacent sections.
fn split_cdata(text: &str) -> Vec<u8> {
    text.replace("]]>", "]]]]><![CDATA[>").into_bytes()
}

fn write_error(err: quick_xml::Error) -> Error {
    Error::Io(err.to_string())
}

impl Element {
    /// Writes this element and its subtree as compact xml.
    pub fn write_str(&self, document: &Document) -> Result<String> {
        document.write_element_str(*self)
    }
}

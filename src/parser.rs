use crate::document::{Document, Node};
use crate::element::Element;
use crate::error::Result;
use crate::log::{ErrorLevel, ErrorRecord};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

/// Options when parsing xml.
///
/// `trim_text`: Whitespace around text nodes is removed, and whitespace-only
/// text between elements is dropped.
///
/// `require_decl`: The document must start with an xml declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub trim_text: bool,
    pub require_decl: bool,
}

/// Turns raw bytes into text, looking at the byte order mark first and the
/// `encoding` of the xml declaration second. Defaults to UTF-8.
pub(crate) fn decode(bytes: &[u8]) -> std::result::Result<String, ErrorRecord> {
    let (encoding, bom_len) = match Encoding::for_bom(bytes) {
        Some(found) => found,
        None => match bytes {
            [0x00, 0x3c, 0x00, 0x3f, ..] => (UTF_16BE, 0),
            [0x3c, 0x00, 0x3f, 0x00, ..] => (UTF_16LE, 0),
            _ => (declared_encoding(bytes)?.unwrap_or(UTF_8), 0),
        },
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            ErrorRecord::new(
                ErrorLevel::Error,
                format!("Input is not proper {}", encoding.name()),
            )
        })
}

// Only ASCII-compatible encodings can get here, so the declaration can be read as bytes.
fn declared_encoding(
    bytes: &[u8],
) -> std::result::Result<Option<&'static Encoding>, ErrorRecord> {
    if !bytes.starts_with(b"<?xml") {
        return Ok(None);
    }
    let end = match bytes.windows(2).position(|w| w == b"?>") {
        Some(end) => end,
        None => return Ok(None),
    };
    let decl = String::from_utf8_lossy(&bytes[..end]);
    let label = match decl.find("encoding") {
        Some(pos) => {
            let rest = decl[pos + "encoding".len()..].trim_start();
            let rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
            let quote = match rest.chars().next() {
                Some(q @ '"') | Some(q @ '\'') => q,
                _ => return Ok(None),
            };
            let value = &rest[1..];
            match value.find(quote) {
                Some(len) => value[..len].to_string(),
                None => return Ok(None),
            }
        }
        None => return Ok(None),
    };
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => Ok(Some(encoding)),
        None => Err(ErrorRecord::new(
            ErrorLevel::Error,
            format!("Unsupported encoding {}", label),
        )),
    }
}

pub(crate) struct DocumentParser {
    document: Document,
    read_opts: ReadOptions,
    element_stack: Vec<Element>,
    seen_decl: bool,
    seen_content: bool,
    seen_root: bool,
}

impl DocumentParser {
    fn new(opts: ReadOptions) -> DocumentParser {
        let document = Document::empty();
        let container = document.container();
        DocumentParser {
            document,
            read_opts: opts,
            element_stack: vec![container], // container element in element_stack
            seen_decl: false,
            seen_content: false,
            seen_root: false,
        }
    }

    pub(crate) fn parse_bytes(bytes: &[u8], opts: ReadOptions) -> Result<Document> {
        let text = decode(bytes)?;
        Self::parse_str(&text, opts)
    }

    pub(crate) fn parse_str(text: &str, opts: ReadOptions) -> Result<Document> {
        let mut parser = DocumentParser::new(opts);
        parser.parse_content(text)?;
        Ok(parser.document)
    }

    fn parse_content(&mut self, text: &str) -> Result<()> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(self.read_opts.trim_text);
        reader.check_end_names(true);
        let mut buf = Vec::with_capacity(200); // reduce time increasing capacity at start.

        loop {
            let event = reader
                .read_event(&mut buf)
                .map_err(|err| fatal(text, reader.buffer_position(), describe(err)))?;
            trace!(?event);
            let done = self
                .handle_event(event)
                .map_err(|message| fatal(text, reader.buffer_position(), message))?;
            if done {
                return Ok(());
            }
            buf.clear();
        }
    }

    // Returns if document parsing is finished.
    fn handle_event(&mut self, event: Event<'_>) -> std::result::Result<bool, String> {
        // untrimmed readers report an empty text between adjacent markup
        if let Event::Text(ref ev) = event {
            if ev.is_empty() {
                return Ok(false);
            }
        }
        if self.read_opts.require_decl && !self.seen_decl && !matches!(event, Event::Decl(_)) {
            return Err("Didn't find XML Declaration at the start of file".to_string());
        }
        match event {
            Event::Decl(ref ev) => {
                if self.seen_decl || self.seen_content {
                    return Err(
                        "XML declaration allowed only at the start of the document".to_string()
                    );
                }
                self.handle_decl(ev)?;
                return Ok(false);
            }
            Event::Eof => {
                if let Some(open) = self.element_stack.get(1..).and_then(|s| s.last()) {
                    return Err(format!(
                        "Premature end of data in tag {}",
                        open.name(&self.document)
                    ));
                }
                if !self.seen_root {
                    return Err("Start tag expected, '<' not found".to_string());
                }
                return Ok(true);
            }
            _ => {}
        }
        self.seen_content = true;
        match event {
            Event::Start(ref ev) => {
                let element = self.handle_bytes_start(ev)?;
                self.element_stack.push(element);
            }
            Event::Empty(ref ev) => {
                self.handle_bytes_start(ev)?;
            }
            Event::End(_) => {
                // quick-xml checks if tag names match for us
                if self.element_stack.len() <= 1 {
                    return Err("Unexpected closing tag".to_string());
                }
                self.element_stack.pop();
            }
            Event::Text(ev) => {
                let bytes = ev.unescaped().map_err(describe)?;
                let content = String::from_utf8(bytes.into_owned()).map_err(|e| e.to_string())?;
                if self.at_top_level() {
                    if !content.trim().is_empty() {
                        return Err(self.misplaced_content());
                    }
                } else if !content.is_empty() {
                    self.push_node(Node::Text(content))?;
                }
            }
            // CData arrives escaped. Comment, PI and DocType content is raw.
            Event::CData(ev) => {
                if self.at_top_level() {
                    return Err(self.misplaced_content());
                }
                let bytes = ev.unescaped().map_err(describe)?;
                let content = String::from_utf8(bytes.into_owned()).map_err(|e| e.to_string())?;
                self.push_node(Node::CData(content))?;
            }
            Event::Comment(ev) => {
                let content = String::from_utf8(ev.to_vec()).map_err(|e| e.to_string())?;
                self.push_node(Node::Comment(content))?;
            }
            Event::PI(ev) => {
                let content = String::from_utf8(ev.to_vec()).map_err(|e| e.to_string())?;
                self.push_node(Node::PI(content))?;
            }
            Event::DocType(ev) => {
                let content = String::from_utf8(ev.to_vec()).map_err(|e| e.to_string())?;
                self.push_node(Node::DocType(content))?;
            }
            Event::Decl(_) | Event::Eof => {}
        }
        Ok(false)
    }

    fn handle_decl(&mut self, ev: &BytesDecl<'_>) -> std::result::Result<(), String> {
        self.seen_decl = true;
        let version = ev.version().map_err(describe)?;
        self.document.version = String::from_utf8_lossy(&version).into_owned();
        self.document.standalone = match ev.standalone() {
            Some(res) => {
                let val = String::from_utf8_lossy(&res.map_err(describe)?).to_lowercase();
                if val == "yes" {
                    true
                } else if val == "no" {
                    false
                } else {
                    return Err(
                        "Standalone Document Declaration has non boolean value".to_string(),
                    );
                }
            }
            None => false,
        };
        Ok(())
    }

    fn handle_bytes_start(&mut self, ev: &BytesStart<'_>) -> std::result::Result<Element, String> {
        if self.at_top_level() && self.seen_root {
            return Err("Extra content at the end of the document".to_string());
        }
        let doc = &mut self.document;
        let name = String::from_utf8(ev.name().to_vec()).map_err(|e| e.to_string())?;
        let element = Element::new(doc, name);
        let attributes = element.mut_attributes(doc);
        for attr in ev.attributes() {
            let attr = attr.map_err(describe)?;
            let key = String::from_utf8(attr.key.to_vec()).map_err(|e| e.to_string())?;
            let value = attr.unescaped_value().map_err(describe)?;
            let value = String::from_utf8(value.into_owned()).map_err(|e| e.to_string())?;
            attributes.insert(key, value);
        }
        self.push_node(Node::Element(element))?;
        if self.at_top_level() {
            self.seen_root = true;
            self.document.set_root(element);
        }
        Ok(element)
    }

    fn push_node(&mut self, node: Node) -> std::result::Result<(), String> {
        let parent = match self.element_stack.last() {
            Some(parent) => *parent,
            None => return Err("Unexpected closing tag".to_string()),
        };
        parent
            .push_child(&mut self.document, node)
            .map_err(|e| e.to_string())
    }

    fn at_top_level(&self) -> bool {
        self.element_stack.len() == 1
    }

    fn misplaced_content(&self) -> String {
        if self.seen_root {
            "Extra content at the end of the document".to_string()
        } else {
            "Start tag expected, '<' not found".to_string()
        }
    }
}

fn describe(err: quick_xml::Error) -> String {
    match err {
        quick_xml::Error::EndEventMismatch { expected, found } if expected.is_empty() => {
            format!("Unexpected closing tag </{}>", found)
        }
        quick_xml::Error::EndEventMismatch { expected, found } => format!(
            "Opening and ending tag mismatch: {} and {}",
            expected, found
        ),
        err => err.to_string(),
    }
}

fn fatal(text: &str, offset: usize, message: String) -> ErrorRecord {
    ErrorRecord::new(ErrorLevel::Fatal, message).at_offset(text, offset)
}

use std::borrow::Cow;
use std::io::{BufRead, Write};

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::tag_document::{Attribute, Element, Node, TagDocument, ROOT_ELEMENT};

const INDENT_WIDTH: usize = 2;
const OUTPUT_ENCODING: &str = "us-ascii";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed tag document: {0}")]
    MalformedDocument(String),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),
}

fn malformed(reason: impl std::fmt::Display) -> DocumentError {
    DocumentError::MalformedDocument(reason.to_string())
}

/// Parse a tag file. Comments are kept, whitespace-only text is dropped, and
/// anything other than a single `hktagfile` root is rejected.
pub fn load_document<R: BufRead>(source: R) -> Result<TagDocument, DocumentError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();

    let mut open: Vec<Element> = Vec::new();
    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| malformed(format!("{} at byte {}", e, reader.buffer_position())))?;

        let node = match event {
            Event::Start(start) => {
                open.push(element_from_start(&start)?);
                None
            }
            Event::Empty(start) => Some(Node::Element(element_from_start(&start)?)),
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| malformed("closing tag without a matching opening tag"))?;
                Some(Node::Element(element))
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                if text.trim().is_empty() {
                    None
                } else {
                    Some(Node::Text(text.into_owned()))
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned()).map_err(malformed)?;
                Some(Node::Text(text))
            }
            Event::Comment(comment) => {
                let text = String::from_utf8(comment.into_inner().into_owned()).map_err(malformed)?;
                Some(Node::Comment(text))
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => None,
            Event::Eof => break,
        };

        if let Some(node) = node {
            if let Some(parent) = open.last_mut() {
                parent.children.push(node);
            } else {
                match node {
                    Node::Element(element) => {
                        if root.is_some() {
                            return Err(malformed(format!(
                                "unexpected second top-level element <{}>",
                                element.name
                            )));
                        }
                        root = Some(element);
                    }
                    Node::Comment(comment) if root.is_none() => prolog.push(Node::Comment(comment)),
                    Node::Comment(comment) => epilog.push(Node::Comment(comment)),
                    Node::Text(_) => {}
                }
            }
        }
        buf.clear();
    }

    if let Some(element) = open.last() {
        return Err(malformed(format!("unclosed element <{}>", element.name)));
    }

    let root = root
        .filter(|element| element.name == ROOT_ELEMENT)
        .ok_or_else(|| malformed(format!("missing <{}> root element", ROOT_ELEMENT)))?;

    Ok(TagDocument { prolog, root, epilog })
}

pub fn parse_document(text: &str) -> Result<TagDocument, DocumentError> {
    load_document(text.as_bytes())
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let qname = start.name();
    let name = std::str::from_utf8(qname.as_ref()).map_err(malformed)?;
    let mut element = Element::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(malformed)?;
        let value = attr.unescape_value().map_err(malformed)?;
        element.attributes.push(Attribute {
            name: key.to_string(),
            value: value.into_owned(),
        });
    }

    Ok(element)
}

/// Serialize the document as indented US-ASCII XML. The sink is borrowed and
/// left open; no trailing newline is written.
pub fn write_document<W: Write>(document: &TagDocument, sink: &mut W) -> Result<(), DocumentError> {
    let mut writer = Writer::new_with_indent(sink, b' ', INDENT_WIDTH);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some(OUTPUT_ENCODING), None)))?;
    for node in &document.prolog {
        write_node(&mut writer, node)?;
    }
    write_element(&mut writer, &document.root)?;
    for node in &document.epilog {
        write_node(&mut writer, node)?;
    }

    Ok(())
}

pub fn document_to_bytes(document: &TagDocument) -> Result<Vec<u8>, DocumentError> {
    let mut bytes = Vec::new();
    write_document(document, &mut bytes)?;
    Ok(bytes)
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<(), DocumentError> {
    match node {
        Node::Element(element) => write_element(writer, element)?,
        Node::Text(text) => {
            let escaped = ascii_references(&escape(text.as_str())).into_owned();
            writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
        }
        Node::Comment(comment) => {
            // character references are not recognized inside comments
            let ascii: String = comment
                .chars()
                .map(|ch| if ch.is_ascii() { ch } else { '?' })
                .collect();
            writer.write_event(Event::Comment(BytesText::from_escaped(ascii)))?;
        }
    }
    Ok(())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        let value = ascii_references(&escape(attr.value.as_str())).into_owned();
        start.push_attribute((attr.name.as_bytes(), value.as_bytes()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Replace every non-ASCII character of already escaped text with a numeric
/// character reference
fn ascii_references(escaped: &str) -> Cow<'_, str> {
    if escaped.is_ascii() {
        return Cow::Borrowed(escaped);
    }
    let mut out = String::with_capacity(escaped.len() + 16);
    for ch in escaped.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            out.push_str(&format!("&#x{:X};", ch as u32));
        }
    }
    Cow::Owned(out)
}

//! XML rendering of a document tree

use crate::document::{AttrValue, Document, NodeId, NodeKind};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt;
use std::io::Cursor;

#[derive(Debug)]
pub enum XmlWriteError {
    Write(String),
    Encoding(std::string::FromUtf8Error),
}

impl fmt::Display for XmlWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlWriteError::Write(err) => write!(f, "xml write error: {}", err),
            XmlWriteError::Encoding(err) => write!(f, "xml output not utf-8: {}", err),
        }
    }
}

impl std::error::Error for XmlWriteError {}

fn attr_text(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => s.clone(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::StrList(items) => items.join(" "),
        AttrValue::IntPairs(pairs) => pairs
            .iter()
            .map(|(low, high)| {
                if low == high {
                    low.to_string()
                } else {
                    format!("{}-{}", low, high)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Render the whole tree as indented XML.
pub fn document_to_xml(document: &Document) -> Result<String, XmlWriteError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_node(&mut writer, document, document.root())?;
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(XmlWriteError::Encoding)
}

fn write_node(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    document: &Document,
    id: NodeId,
) -> Result<(), XmlWriteError> {
    let node = document.node(id);
    if node.kind == NodeKind::Text {
        let value = node.value.as_deref().unwrap_or("");
        return emit(writer, Event::Text(BytesText::new(value)));
    }
    let tag = node.kind.tag();
    let mut start = BytesStart::new(tag);
    if !node.names.is_empty() {
        start.push_attribute(("names", node.names.join(" ").as_str()));
    }
    if !node.dupnames.is_empty() {
        start.push_attribute(("dupnames", node.dupnames.join(" ").as_str()));
    }
    if !node.ids.is_empty() {
        start.push_attribute(("ids", node.ids.join(" ").as_str()));
    }
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), attr_text(value).as_str()));
    }
    let text = node.value.as_deref().unwrap_or("");
    if node.children.is_empty() && text.is_empty() {
        emit(writer, Event::Empty(start))?;
        return Ok(());
    }
    emit(writer, Event::Start(start))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    for &child in &node.children {
        write_node(writer, document, child)?;
    }
    emit(writer, Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn emit(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    event: Event<'_>,
) -> Result<(), XmlWriteError> {
    writer
        .write_event(event)
        .map_err(|err| XmlWriteError::Write(err.to_string()))
}

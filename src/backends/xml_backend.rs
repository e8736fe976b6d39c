//! Well-formed XML backend ([MODULE G]) — parses a `.xml` file into an
//! [`Element`] tree with `quick_xml` and hands it to
//! [`ElementTreeBackend`] for the namespace walk.

use std::path::Path as FsPath;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::backends::element_tree::{Element, ElementTreeBackend};
use crate::path::Segments;

fn local_name(qname: quick_xml::name::QName) -> String {
    String::from_utf8_lossy(qname.local_name().as_ref()).to_string()
}

fn parse(text: &str) -> BackendResult<Element> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut root = Element::new("");
    let mut stack: Vec<Element> = vec![root.clone()];
    root.children.clear();

    loop {
        match reader
            .read_event()
            .map_err(|e| BackendError::Backend(format!("malformed XML: {e}")))?
        {
            Event::Start(start) => {
                let mut element = Element::new(local_name(start.name()));
                for attr in start.attributes() {
                    let attr = attr.map_err(|e| BackendError::Backend(format!("malformed XML: {e}")))?;
                    let value = attr
                        .decode_and_unescape_value(reader.decoder())
                        .map_err(|e| BackendError::Backend(format!("malformed XML: {e}")))?;
                    element
                        .attribs
                        .push((local_name(attr.key), value.to_string()));
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let mut element = Element::new(local_name(start.name()));
                for attr in start.attributes() {
                    let attr = attr.map_err(|e| BackendError::Backend(format!("malformed XML: {e}")))?;
                    let value = attr
                        .decode_and_unescape_value(reader.decoder())
                        .map_err(|e| BackendError::Backend(format!("malformed XML: {e}")))?;
                    element
                        .attribs
                        .push((local_name(attr.key), value.to_string()));
                }
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| BackendError::Backend("malformed XML: unbalanced tags".to_string()))?;
                parent.children.push(element);
            }
            Event::End(_) => {
                let finished = stack
                    .pop()
                    .ok_or_else(|| BackendError::Backend("malformed XML: unbalanced tags".to_string()))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| BackendError::Backend("malformed XML: unbalanced tags".to_string()))?;
                parent.children.push(finished);
            }
            Event::Text(text) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| BackendError::Backend(format!("malformed XML: {e}")))?;
                if let Some(top) = stack.last_mut() {
                    // Only the leading text (before the first child element) is
                    // an element's own `.text`, mirroring ElementTree semantics;
                    // text trailing a closed child is that child's tail, not ours.
                    if top.children.is_empty() {
                        let existing = top.text.get_or_insert_with(String::new);
                        existing.push_str(&unescaped);
                    }
                }
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(cdata.as_ref()).to_string();
                if let Some(top) = stack.last_mut() {
                    if top.children.is_empty() {
                        let existing = top.text.get_or_insert_with(String::new);
                        existing.push_str(&text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(BackendError::Backend(
            "malformed XML: unclosed elements".to_string(),
        ));
    }
    root = stack.pop().unwrap();
    if root.children.is_empty() {
        return Err(BackendError::Backend(
            "XML document has no root element".to_string(),
        ));
    }
    trim_text(&mut root);
    Ok(root)
}

/// Trim each element's accumulated text, dropping it entirely if it is
/// whitespace-only, matching the original's `(element.text or "").strip()`.
fn trim_text(element: &mut Element) {
    element.text = element
        .text
        .take()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    for child in &mut element.children {
        trim_text(child);
    }
}

pub struct XmlBackend {
    inner: ElementTreeBackend,
}

impl XmlBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Backend(format!("cannot read XML file: {e}")))?;
        let root = parse(&text)?;
        Ok(Self {
            inner: ElementTreeBackend::new(root),
        })
    }
}

impl Backend for XmlBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        self.inner.info(path)
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        self.inner.list(path)
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        self.inner.get(path)
    }
}

//! Lenient HTML backend ([MODULE G]). HTML markup is routinely broken in
//! ways well-formed XML never is, so this hand-rolls a small tolerant
//! tokenizer rather than reaching for a tree-repairing parser: unmatched
//! closing tags pop back to the nearest matching open tag (or are ignored
//! if none is open), void/self-closing tags never push onto the open-tag
//! stack, and elements still open at end of input are dropped rather than
//! auto-closed.

use std::path::Path as FsPath;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::backends::element_tree::{Element, ElementTreeBackend};
use crate::path::Segments;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;
    let n = chars.len();
    while i < n {
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= n {
            break;
        }
        let name_start = i;
        while i < n && !chars[i].is_whitespace() && chars[i] != '=' {
            i += 1;
        }
        let name: String = chars[name_start..i].iter().collect::<String>().to_lowercase();
        if name.is_empty() {
            i += 1;
            continue;
        }
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        if i < n && chars[i] == '=' {
            i += 1;
            while i < n && chars[i].is_whitespace() {
                i += 1;
            }
            let value = if i < n && (chars[i] == '"' || chars[i] == '\'') {
                let quote = chars[i];
                i += 1;
                let start = i;
                while i < n && chars[i] != quote {
                    i += 1;
                }
                let value: String = chars[start..i].iter().collect();
                if i < n {
                    i += 1;
                }
                value
            } else {
                let start = i;
                while i < n && !chars[i].is_whitespace() {
                    i += 1;
                }
                chars[start..i].iter().collect()
            };
            attrs.push((name, value));
        } else {
            attrs.push((name, String::new()));
        }
    }
    attrs
}

fn parse(html: &str) -> Element {
    let mut stack = vec![Element::new("document")];
    let bytes: Vec<char> = html.chars().collect();
    let n = bytes.len();
    let mut i = 0;

    while i < n {
        if bytes[i] != '<' {
            let start = i;
            while i < n && bytes[i] != '<' {
                i += 1;
            }
            let chunk: String = bytes[start..i].iter().collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                if let Some(top) = stack.last_mut() {
                    match &mut top.text {
                        Some(existing) => {
                            existing.push(' ');
                            existing.push_str(trimmed);
                        }
                        None => top.text = Some(trimmed.to_string()),
                    }
                }
            }
            continue;
        }

        if html[byte_offset(&bytes, i)..].starts_with("<!--") {
            if let Some(end) = find(&bytes, i + 4, "-->") {
                i = end + 3;
            } else {
                break;
            }
            continue;
        }
        if html[byte_offset(&bytes, i)..].starts_with("<!") {
            if let Some(end) = find_char(&bytes, i + 2, '>') {
                i = end + 1;
            } else {
                break;
            }
            continue;
        }

        let Some(tag_end) = find_char(&bytes, i + 1, '>') else {
            break;
        };
        let inner: String = bytes[i + 1..tag_end].iter().collect();
        i = tag_end + 1;

        if let Some(closing) = inner.strip_prefix('/') {
            let name = closing.trim().to_lowercase();
            if let Some(pos) = stack.iter().skip(1).rposition(|e| e.name == name) {
                let pos = pos + 1;
                while stack.len() > pos {
                    let finished = stack.pop().unwrap();
                    stack.last_mut().unwrap().children.push(finished);
                }
            }
            continue;
        }

        let self_closing_marker = inner.trim_end().ends_with('/');
        let body = if self_closing_marker {
            inner.trim_end().trim_end_matches('/')
        } else {
            inner.as_str()
        };
        let mut parts = body.splitn(2, |c: char| c.is_whitespace());
        let tag_name = parts.next().unwrap_or("").to_lowercase();
        if tag_name.is_empty() {
            continue;
        }
        let attrs = parts.next().map(parse_attrs).unwrap_or_default();

        let mut element = Element::new(tag_name.clone());
        element.attribs = attrs;

        if self_closing_marker || VOID_ELEMENTS.contains(&tag_name.as_str()) {
            stack.last_mut().unwrap().children.push(element);
        } else {
            stack.push(element);
        }
    }

    stack.remove(0)
}

fn byte_offset(chars: &[char], char_index: usize) -> usize {
    chars[..char_index].iter().map(|c| c.len_utf8()).sum()
}

fn find(chars: &[char], from: usize, needle: &str) -> Option<usize> {
    let needle_chars: Vec<char> = needle.chars().collect();
    let window = needle_chars.len();
    if from >= chars.len() || window == 0 {
        return None;
    }
    (from..=chars.len().saturating_sub(window)).find(|&i| chars[i..i + window] == needle_chars[..])
}

fn find_char(chars: &[char], from: usize, needle: char) -> Option<usize> {
    (from..chars.len()).find(|&i| chars[i] == needle)
}

pub struct HtmlBackend {
    inner: ElementTreeBackend,
}

impl HtmlBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Backend(format!("cannot read HTML file: {e}")))?;
        let root = parse(&text);
        Ok(Self {
            inner: ElementTreeBackend::new(root),
        })
    }
}

impl Backend for HtmlBackend {
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

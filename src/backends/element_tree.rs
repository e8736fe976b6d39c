//! Shared element-tree projection ([MODULE G]) used by both the XML and
//! HTML backends. An [`Element`] is parser-agnostic: each format's parser
//! builds one, then hands it to [`ElementTreeBackend`] for the actual
//! namespace walk.
//!
//! Projection rules for one element `E`:
//! - non-empty (trimmed) text content becomes a synthetic `_text` file;
//! - one or more attributes become a synthetic `_attribs` directory, one
//!   file per attribute;
//! - each child becomes a child directory, named by its local tag with
//!   `_0`, `_1`, … appended when siblings share a tag, in document order.
//!
//! `_text` and `_attribs` are not elements themselves: descending past them
//! as if they had element children always fails with `NotFound`.

use std::collections::HashMap;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

const TEXT_ENTRY: &str = "_text";
const ATTRIBS_ENTRY: &str = "_attribs";

/// One node of a parsed element tree. The document's implicit root is an
/// `Element` too (name is ignored for the root, since it is never itself
/// addressed in the namespace — only its children are).
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub text: Option<String>,
    pub attribs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            attribs: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Direct children of `parent`, paired with their disambiguated namespace
/// name, in document order.
fn named_children(parent: &Element) -> Vec<(String, &Element)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for child in &parent.children {
        *counts.entry(child.name.as_str()).or_insert(0) += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    parent
        .children
        .iter()
        .map(|child| {
            let total = counts[child.name.as_str()];
            if total > 1 {
                let next = seen.entry(child.name.as_str()).or_insert(0);
                let name = format!("{}_{}", child.name, next);
                *next += 1;
                (name, child)
            } else {
                (child.name.clone(), child)
            }
        })
        .collect()
}

enum Resolved<'a> {
    Element(&'a Element),
    AttribsDir(&'a [(String, String)]),
    Text(&'a str),
    Attrib(&'a str),
}

fn resolve<'a>(root: &'a Element, path: &Segments) -> BackendResult<Resolved<'a>> {
    let mut current = Resolved::Element(root);
    for part in path {
        current = match current {
            Resolved::Element(el) if part == TEXT_ENTRY => {
                // Parsers store `text` already trimmed/normalized and `None`
                // when there is no meaningful own-level text.
                let text = el
                    .text
                    .as_deref()
                    .ok_or_else(|| BackendError::not_found(path))?;
                Resolved::Text(text)
            }
            Resolved::Element(el) if part == ATTRIBS_ENTRY => {
                if el.attribs.is_empty() {
                    return Err(BackendError::not_found(path));
                }
                Resolved::AttribsDir(&el.attribs)
            }
            Resolved::Element(el) => {
                let child = named_children(el)
                    .into_iter()
                    .find(|(name, _)| name == part)
                    .map(|(_, c)| c)
                    .ok_or_else(|| BackendError::not_found(path))?;
                Resolved::Element(child)
            }
            Resolved::AttribsDir(attribs) => {
                let value = attribs
                    .iter()
                    .find(|(k, _)| k == part)
                    .map(|(_, v)| v.as_str())
                    .ok_or_else(|| BackendError::not_found(path))?;
                Resolved::Attrib(value)
            }
            Resolved::Text(_) | Resolved::Attrib(_) => return Err(BackendError::not_found(path)),
        };
    }
    Ok(current)
}

/// `Backend` implementation shared by the XML and HTML adapters.
pub struct ElementTreeBackend {
    root: Element,
}

impl ElementTreeBackend {
    pub fn new(root: Element) -> Self {
        Self { root }
    }
}

impl Backend for ElementTreeBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match resolve(&self.root, path)? {
            Resolved::Element(_) | Resolved::AttribsDir(_) => Ok(ResourceInfo::dir()),
            Resolved::Text(t) => Ok(ResourceInfo::file(t.len() as u64, "text/plain")),
            Resolved::Attrib(v) => Ok(ResourceInfo::file(v.len() as u64, "text/plain")),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match resolve(&self.root, path)? {
            Resolved::Element(el) => {
                let mut entries = Vec::new();
                if el.text.is_some() {
                    entries.push(TEXT_ENTRY.to_string());
                }
                if !el.attribs.is_empty() {
                    entries.push(ATTRIBS_ENTRY.to_string());
                }
                let mut child_names: Vec<String> =
                    named_children(el).into_iter().map(|(name, _)| name).collect();
                child_names.sort();
                entries.extend(child_names);
                Ok(entries)
            }
            Resolved::AttribsDir(attribs) => {
                let mut names: Vec<String> = attribs.iter().map(|(k, _)| k.clone()).collect();
                names.sort();
                Ok(names)
            }
            Resolved::Text(_) | Resolved::Attrib(_) => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match resolve(&self.root, path)? {
            Resolved::Text(t) => Ok(t.as_bytes().to_vec()),
            Resolved::Attrib(v) => Ok(v.as_bytes().to_vec()),
            Resolved::Element(_) | Resolved::AttribsDir(_) => Err(BackendError::not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> ElementTreeBackend {
        let mut a0 = Element::new("a");
        a0.text = Some("x".to_string());
        let mut a1 = Element::new("a");
        a1.text = Some("y".to_string());
        a1.attribs.push(("id".to_string(), "2".to_string()));

        let mut r = Element::new("r");
        r.attribs.push(("version".to_string(), "1".to_string()));
        r.children.push(a0);
        r.children.push(a1);

        let mut root = Element::new("");
        root.children.push(r);

        ElementTreeBackend::new(root)
    }

    #[test]
    fn duplicate_siblings_get_disambiguated() {
        let backend = fixture();
        assert_eq!(backend.list(&vec!["r".to_string()]).unwrap()[1..], vec!["a_0", "a_1"]);
    }

    #[test]
    fn text_and_attribs_resolve() {
        let backend = fixture();
        let a0_text = vec!["r".to_string(), "a_0".to_string(), "_text".to_string()];
        assert_eq!(backend.get(&a0_text).unwrap(), b"x");

        let a1_id = vec![
            "r".to_string(),
            "a_1".to_string(),
            "_attribs".to_string(),
            "id".to_string(),
        ];
        assert_eq!(backend.get(&a1_id).unwrap(), b"2");
    }

    #[test]
    fn reserved_names_are_not_traversable() {
        let backend = fixture();
        let bogus = vec![
            "r".to_string(),
            "a_0".to_string(),
            "_text".to_string(),
            "child".to_string(),
        ];
        assert!(backend.info(&bogus).is_err());
    }

    #[test]
    fn element_without_attribs_has_no_attribs_entry() {
        let backend = fixture();
        let entries = backend
            .list(&vec!["r".to_string(), "a_0".to_string()])
            .unwrap();
        assert_eq!(entries, vec!["_text"]);
    }
}

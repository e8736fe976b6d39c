//! Source-code backend ([MODULE I]) — mounts a `.py` file, exposing its
//! top-level functions and classes. Parsing uses `tree-sitter` with the
//! Python grammar rather than hand-rolling a parser, since the grammar is
//! the one place a hand-rolled tokenizer genuinely buys nothing.

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use tree_sitter::{Node, Parser};

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

enum Entry {
    Function(Vec<u8>),
    Class(BTreeMap<String, Vec<u8>>),
}

pub struct AstBackend {
    entries: BTreeMap<String, Entry>,
}

fn lines_keepends(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch == '\n' {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                (*l).to_string()
            } else {
                let strip = indent.min(l.len());
                l[strip..].to_string()
            }
        })
        .collect()
}

fn extract_source(lines: &[String], node: Node) -> Vec<u8> {
    let start = node.start_position().row;
    let end = node.end_position().row.min(lines.len().saturating_sub(1));
    let joined: String = lines[start..=end].concat();
    dedent(&joined).into_bytes()
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() != "decorated_definition" {
        return node;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "function_definition" || child.kind() == "class_definition" {
            return child;
        }
    }
    node
}

fn node_name<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name("name")?.utf8_text(source).ok()
}

impl AstBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Backend(format!("cannot read Python file: {e}")))?;
        let lines = lines_keepends(&source);

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| BackendError::Backend(format!("cannot load Python grammar: {e}")))?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| BackendError::Backend("cannot parse Python file".to_string()))?;
        if tree.root_node().has_error() {
            return Err(BackendError::Backend(
                "cannot parse Python file: syntax error".to_string(),
            ));
        }

        let mut entries = BTreeMap::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let def = unwrap_decorated(child);
            match def.kind() {
                "function_definition" => {
                    let Some(name) = node_name(def, source.as_bytes()) else {
                        continue;
                    };
                    entries.insert(
                        format!("{name}.py"),
                        Entry::Function(extract_source(&lines, def)),
                    );
                }
                "class_definition" => {
                    let Some(name) = node_name(def, source.as_bytes()) else {
                        continue;
                    };
                    let mut methods = BTreeMap::new();
                    if let Some(body) = def.child_by_field_name("body") {
                        let mut body_cursor = body.walk();
                        for item in body.named_children(&mut body_cursor) {
                            let item_def = unwrap_decorated(item);
                            if item_def.kind() == "function_definition" {
                                let Some(mname) = node_name(item_def, source.as_bytes()) else {
                                    continue;
                                };
                                methods.insert(
                                    format!("{mname}.py"),
                                    extract_source(&lines, item_def),
                                );
                            }
                        }
                    }
                    entries.insert(name.to_string(), Entry::Class(methods));
                }
                _ => {}
            }
        }

        Ok(Self { entries })
    }
}

impl Backend for AstBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match path.as_slice() {
            [] => Ok(ResourceInfo::dir()),
            [name] => match self.entries.get(name) {
                Some(Entry::Function(data)) => Ok(ResourceInfo::file(data.len() as u64, "text/x-python")),
                Some(Entry::Class(_)) => Ok(ResourceInfo::dir()),
                None => Err(BackendError::not_found(path)),
            },
            [class, method] => match self.entries.get(class) {
                Some(Entry::Class(methods)) => methods
                    .get(method)
                    .map(|data| ResourceInfo::file(data.len() as u64, "text/x-python"))
                    .ok_or_else(|| BackendError::not_found(path)),
                _ => Err(BackendError::not_found(path)),
            },
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match path.as_slice() {
            [] => Ok(self.entries.keys().cloned().collect()),
            [name] => match self.entries.get(name) {
                Some(Entry::Class(methods)) => Ok(methods.keys().cloned().collect()),
                Some(Entry::Function(_)) => Err(BackendError::not_found(path)),
                None => Err(BackendError::not_found(path)),
            },
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match path.as_slice() {
            [name] => match self.entries.get(name) {
                Some(Entry::Function(data)) => Ok(data.clone()),
                _ => Err(BackendError::not_found(path)),
            },
            [class, method] => match self.entries.get(class) {
                Some(Entry::Class(methods)) => methods
                    .get(method)
                    .cloned()
                    .ok_or_else(|| BackendError::not_found(path)),
                _ => Err(BackendError::not_found(path)),
            },
            _ => Err(BackendError::not_found(path)),
        }
    }
}

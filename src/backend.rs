//! The abstract resource layer: the three-operation backend contract and
//! the error taxonomy every adapter must respect.

use std::collections::BTreeMap;

use crate::path::Segments;

/// Metadata about a resource (file or directory).
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub is_dir: bool,
    pub size: u64,
    pub content_type: String,
}

impl ResourceInfo {
    pub fn dir() -> Self {
        Self {
            is_dir: true,
            size: 0,
            content_type: "application/octet-stream".to_string(),
        }
    }

    pub fn file(size: u64, content_type: impl Into<String>) -> Self {
        Self {
            is_dir: false,
            size,
            content_type: content_type.into(),
        }
    }
}

/// Errors crossing the resource-interface boundary. A conforming backend
/// never raises anything else.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl BackendError {
    pub fn not_found(path: &Segments) -> Self {
        BackendError::NotFound(crate::path::to_string(path))
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The abstract read-only filesystem interface every backend implements.
///
/// Paths are segment lists: `[]` is root, `["a", "b"]` is `/a/b`. The root
/// always exists and is always a directory. Implementations must be `Send +
/// Sync`: the front end shares one backend instance across concurrent
/// request handlers.
pub trait Backend: Send + Sync {
    /// Metadata for the resource at `path`. `NotFound` if nothing exists there.
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo>;

    /// Child names of the directory at `path`, unique, in the backend's
    /// documented order (lexicographic unless stated otherwise). `NotFound`
    /// if `path` does not exist or is a file.
    fn list(&self, path: &Segments) -> BackendResult<Vec<String>>;

    /// The byte content of the file at `path`. `NotFound` if `path` does not
    /// exist or is a directory.
    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>>;
}

/// In-memory backend backed by a nested tree, used as a fixture for
/// front-end tests ([MODULE L]).
///
/// Structure: nested maps are directories, leaf values are file contents.
pub enum MemoryNode {
    Dir(BTreeMap<String, MemoryNode>),
    File(Vec<u8>),
}

impl MemoryNode {
    pub fn dir(entries: impl IntoIterator<Item = (&'static str, MemoryNode)>) -> Self {
        MemoryNode::Dir(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn file(content: impl Into<Vec<u8>>) -> Self {
        MemoryNode::File(content.into())
    }

    pub fn text(content: impl AsRef<str>) -> Self {
        MemoryNode::File(content.as_ref().as_bytes().to_vec())
    }
}

pub struct MemoryBackend {
    root: MemoryNode,
}

impl MemoryBackend {
    pub fn new(root: MemoryNode) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &Segments) -> BackendResult<&MemoryNode> {
        let mut node = &self.root;
        for part in path {
            match node {
                MemoryNode::Dir(children) => {
                    node = children
                        .get(part)
                        .ok_or_else(|| BackendError::not_found(path))?;
                }
                MemoryNode::File(_) => return Err(BackendError::not_found(path)),
            }
        }
        Ok(node)
    }
}

impl Backend for MemoryBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match self.resolve(path)? {
            MemoryNode::Dir(_) => Ok(ResourceInfo::dir()),
            MemoryNode::File(data) => Ok(ResourceInfo::file(data.len() as u64, "text/plain")),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match self.resolve(path)? {
            MemoryNode::Dir(children) => Ok(children.keys().cloned().collect()),
            MemoryNode::File(_) => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match self.resolve(path)? {
            MemoryNode::Dir(_) => Err(BackendError::not_found(path)),
            MemoryNode::File(data) => Ok(data.clone()),
        }
    }
}

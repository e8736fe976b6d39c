//! JSON tree-document backend ([MODULE D]) — mounts a `.json` file.
//! Maps become directories keyed by their keys, lists become directories
//! keyed by decimal index, and scalars become files.

use std::path::Path as FsPath;

use serde_json::Value;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

pub struct JsonBackend {
    root: Value,
}

impl JsonBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Backend(format!("cannot read JSON file: {e}")))?;
        let root: Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::Backend(format!("cannot read JSON file: {e}")))?;

        if !root.is_object() && !root.is_array() {
            return Err(BackendError::Backend(
                "JSON root must be an object or array".to_string(),
            ));
        }

        Ok(Self { root })
    }

    fn resolve<'a>(&'a self, path: &Segments) -> BackendResult<&'a Value> {
        let mut node = &self.root;
        for part in path {
            node = match node {
                Value::Object(map) => map.get(part).ok_or_else(|| BackendError::not_found(path))?,
                Value::Array(list) => {
                    let index: usize = part.parse().map_err(|_| BackendError::not_found(path))?;
                    list.get(index).ok_or_else(|| BackendError::not_found(path))?
                }
                _ => return Err(BackendError::not_found(path)),
            };
        }
        Ok(node)
    }
}

fn scalar_to_bytes(node: &Value) -> Vec<u8> {
    match node {
        Value::Null => b"null".to_vec(),
        Value::Bool(true) => b"true".to_vec(),
        Value::Bool(false) => b"false".to_vec(),
        Value::Number(n) => n.to_string().into_bytes(),
        Value::String(s) => s.clone().into_bytes(),
        Value::Object(_) | Value::Array(_) => unreachable!("scalar_to_bytes called on a container"),
    }
}

impl Backend for JsonBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        let node = self.resolve(path)?;
        if node.is_object() || node.is_array() {
            return Ok(ResourceInfo::dir());
        }
        let data = scalar_to_bytes(node);
        Ok(ResourceInfo::file(data.len() as u64, "text/plain"))
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match self.resolve(path)? {
            Value::Object(map) => {
                let mut keys: Vec<String> = map.keys().cloned().collect();
                keys.sort();
                Ok(keys)
            }
            Value::Array(list) => Ok((0..list.len()).map(|i| i.to_string()).collect()),
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        let node = self.resolve(path)?;
        if node.is_object() || node.is_array() {
            return Err(BackendError::not_found(path));
        }
        Ok(scalar_to_bytes(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> JsonBackend {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        std::fs::write(
            &path,
            r#"{"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}}"#,
        )
        .unwrap();
        // Keep the tempdir alive for the lifetime of the test by leaking it;
        // the file is read eagerly at construction so this is safe.
        let backend = JsonBackend::open(&path).unwrap();
        std::mem::forget(dir);
        backend
    }

    #[test]
    fn resolves_nested_maps_and_lists() {
        let backend = fixture();
        assert_eq!(backend.get(&vec!["a".to_string()]).unwrap(), b"1");
        assert_eq!(
            backend
                .get(&vec!["b".to_string(), "0".to_string()])
                .unwrap(),
            b"true"
        );
        assert_eq!(
            backend
                .get(&vec!["b".to_string(), "1".to_string()])
                .unwrap(),
            b"null"
        );
        assert_eq!(
            backend
                .get(&vec!["c".to_string(), "d".to_string()])
                .unwrap(),
            b"2.5"
        );
    }

    #[test]
    fn list_indexing_rejects_non_numeric_and_out_of_range() {
        let backend = fixture();
        assert!(backend
            .info(&vec!["b".to_string(), "nope".to_string()])
            .is_err());
        assert!(backend
            .info(&vec!["b".to_string(), "99".to_string()])
            .is_err());
    }

    #[test]
    fn scalar_root_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalar.json");
        std::fs::write(&path, "42").unwrap();
        assert!(JsonBackend::open(&path).is_err());
    }
}

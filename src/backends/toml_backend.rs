//! TOML tree-document backend ([MODULE D]) — mounts a `.toml` file. A TOML
//! document's root is always a table, so unlike JSON there is no scalar-root
//! rejection case here.

use std::path::Path as FsPath;

use toml::Value;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

pub struct TomlBackend {
    root: Value,
}

impl TomlBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Backend(format!("cannot read TOML file: {e}")))?;
        let root: Value = toml::from_str(&text)
            .map_err(|e| BackendError::Backend(format!("cannot read TOML file: {e}")))?;
        Ok(Self { root })
    }

    fn resolve<'a>(&'a self, path: &Segments) -> BackendResult<&'a Value> {
        let mut node = &self.root;
        for part in path {
            node = match node {
                Value::Table(map) => map.get(part).ok_or_else(|| BackendError::not_found(path))?,
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
        Value::Boolean(true) => b"true".to_vec(),
        Value::Boolean(false) => b"false".to_vec(),
        Value::String(s) => s.clone().into_bytes(),
        Value::Integer(i) => i.to_string().into_bytes(),
        Value::Float(f) => f.to_string().into_bytes(),
        Value::Datetime(dt) => dt.to_string().into_bytes(),
        Value::Array(_) | Value::Table(_) => unreachable!("scalar_to_bytes called on a container"),
    }
}

impl Backend for TomlBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        let node = self.resolve(path)?;
        if matches!(node, Value::Table(_) | Value::Array(_)) {
            return Ok(ResourceInfo::dir());
        }
        let data = scalar_to_bytes(node);
        Ok(ResourceInfo::file(data.len() as u64, "text/plain"))
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match self.resolve(path)? {
            Value::Table(map) => {
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
        if matches!(node, Value::Table(_) | Value::Array(_)) {
            return Err(BackendError::not_found(path));
        }
        Ok(scalar_to_bytes(node))
    }
}

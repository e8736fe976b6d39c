//! `?json` and `?zip` dump rendering for GET requests ([MODULE K]).
//!
//! Both walk the backend recursively from the requested path. Any error
//! encountered mid-walk (a child vanishing, a backend reporting an internal
//! failure) aborts the whole dump rather than producing a partial result.

use std::io::Write as _;

use serde_json::Value;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::backend::{Backend, BackendResult};
use crate::path::{self, Segments};

/// Render the subtree rooted at `path` as pretty-printed JSON: directories
/// become objects, files become their content decoded as UTF-8 (or `null`
/// if the bytes are not valid UTF-8).
pub fn json_dump(backend: &dyn Backend, path: &Segments) -> BackendResult<Vec<u8>> {
    let value = json_value(backend, path)?;
    Ok(serde_json::to_vec_pretty(&value).expect("Value serialization cannot fail"))
}

fn json_value(backend: &dyn Backend, path: &Segments) -> BackendResult<Value> {
    let info = backend.info(path)?;
    if info.is_dir {
        let mut map = serde_json::Map::new();
        for name in backend.list(path)? {
            let child = path::join(path, &name);
            map.insert(name, json_value(backend, &child)?);
        }
        Ok(Value::Object(map))
    } else {
        let data = backend.get(path)?;
        Ok(match String::from_utf8(data) {
            Ok(text) => Value::String(text),
            Err(_) => Value::Null,
        })
    }
}

/// Render the subtree rooted at `path` as a zip archive. A single file is
/// stored under its own final segment name (or `"data"` at the root);
/// a directory is walked with `/`-joined relative paths as entry names.
pub fn zip_dump(backend: &dyn Backend, path: &Segments) -> BackendResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = ZipWriter::new(cursor);
        let options: FileOptions<()> = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let info = backend.info(path)?;
        if info.is_dir {
            add_dir(backend, path, "", &mut writer, options)?;
        } else {
            let name = path.last().cloned().unwrap_or_else(|| "data".to_string());
            let data = backend.get(path)?;
            writer
                .start_file(name, options)
                .expect("zip entry name is valid");
            writer.write_all(&data).expect("writing to an in-memory buffer cannot fail");
        }
        writer.finish().expect("finishing an in-memory zip cannot fail");
    }
    Ok(buf)
}

fn add_dir(
    backend: &dyn Backend,
    path: &Segments,
    prefix: &str,
    writer: &mut ZipWriter<std::io::Cursor<&mut Vec<u8>>>,
    options: FileOptions<()>,
) -> BackendResult<()> {
    for name in backend.list(path)? {
        let child = path::join(path, &name);
        let entry_name = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let info = backend.info(&child)?;
        if info.is_dir {
            add_dir(backend, &child, &entry_name, writer, options)?;
        } else {
            let data = backend.get(&child)?;
            writer
                .start_file(&entry_name, options)
                .expect("zip entry name is valid");
            writer.write_all(&data).expect("writing to an in-memory buffer cannot fail");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryNode};

    fn fixture() -> MemoryBackend {
        MemoryBackend::new(MemoryNode::dir([
            ("hello.txt", MemoryNode::text("hi")),
            (
                "docs",
                MemoryNode::dir([("guide.txt", MemoryNode::text("a guide"))]),
            ),
        ]))
    }

    #[test]
    fn json_dump_renders_nested_structure() {
        let backend = fixture();
        let bytes = json_dump(&backend, &vec![]).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["hello.txt"], Value::String("hi".to_string()));
        assert_eq!(value["docs"]["guide.txt"], Value::String("a guide".to_string()));
    }

    #[test]
    fn json_dump_of_a_single_file_is_its_string_content() {
        let backend = fixture();
        let bytes = json_dump(&backend, &vec!["hello.txt".to_string()]).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, Value::String("hi".to_string()));
    }

    #[test]
    fn zip_dump_contains_nested_entries() {
        let backend = fixture();
        let bytes = zip_dump(&backend, &vec![]).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"hello.txt".to_string()));
        assert!(names.contains(&"docs/guide.txt".to_string()));
    }

    #[test]
    fn zip_dump_of_a_single_file_uses_its_name() {
        let backend = fixture();
        let bytes = zip_dump(&backend, &vec!["hello.txt".to_string()]).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.by_index(0).unwrap().name(), "hello.txt");
    }
}

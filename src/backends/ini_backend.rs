//! Sectioned-config backend ([MODULE F]) — mounts a `.ini`/`.cfg` file as a
//! two-level `/<section>/<key>` namespace.

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use ini::Ini;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

pub struct IniBackend {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl IniBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| BackendError::Backend(format!("cannot read INI file: {e}")))?;

        let mut sections = BTreeMap::new();
        for (name, props) in ini.iter() {
            let Some(name) = name else { continue };
            let entry: &mut BTreeMap<String, String> =
                sections.entry(name.to_string()).or_default();
            for (key, value) in props.iter() {
                entry.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self { sections })
    }
}

impl Backend for IniBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match path.as_slice() {
            [] => Ok(ResourceInfo::dir()),
            [section] => {
                if self.sections.contains_key(section) {
                    Ok(ResourceInfo::dir())
                } else {
                    Err(BackendError::not_found(path))
                }
            }
            [section, key] => {
                let value = self
                    .sections
                    .get(section)
                    .and_then(|props| props.get(key))
                    .ok_or_else(|| BackendError::not_found(path))?;
                Ok(ResourceInfo::file(value.len() as u64, "text/plain"))
            }
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match path.as_slice() {
            [] => Ok(self.sections.keys().cloned().collect()),
            [section] => self
                .sections
                .get(section)
                .map(|props| props.keys().cloned().collect())
                .ok_or_else(|| BackendError::not_found(path)),
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match path.as_slice() {
            [section, key] => self
                .sections
                .get(section)
                .and_then(|props| props.get(key))
                .map(|v| v.clone().into_bytes())
                .ok_or_else(|| BackendError::not_found(path)),
            _ => Err(BackendError::not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, IniBackend) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.ini");
        std::fs::write(
            &path,
            "[server]\nhost = localhost\nport = 8080\n\n[client]\ntimeout = 30\n",
        )
        .unwrap();
        let backend = IniBackend::open(&path).unwrap();
        (dir, backend)
    }

    #[test]
    fn listings_are_sorted() {
        let (_dir, backend) = fixture();
        assert_eq!(backend.list(&vec![]).unwrap(), vec!["client", "server"]);
        assert_eq!(
            backend.list(&vec!["server".to_string()]).unwrap(),
            vec!["host", "port"]
        );
    }

    #[test]
    fn unknown_section_or_key_not_found() {
        let (_dir, backend) = fixture();
        assert!(backend.info(&vec!["nope".to_string()]).is_err());
        assert!(backend
            .info(&vec!["server".to_string(), "nope".to_string()])
            .is_err());
    }

    #[test]
    fn value_bytes_match_declared_size() {
        let (_dir, backend) = fixture();
        let path = vec!["server".to_string(), "host".to_string()];
        let info = backend.info(&path).unwrap();
        assert_eq!(info.size as usize, backend.get(&path).unwrap().len());
    }
}

//! ZIP archive backend ([MODULE C]) — mounts a `.zip` file as a read-only
//! filesystem. Directories are inferred from the flat member list; the
//! `zip` crate needs `&mut self` to read a member's bytes, so the archive
//! handle is serialized behind a mutex for the backend's lifetime.

use std::fs::File;
use std::path::Path as FsPath;
use std::sync::Mutex;

use zip::ZipArchive;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::backends::archive::{member_segments, ArchiveIndex};
use crate::path::Segments;

struct ZipMember {
    index: usize,
    size: u64,
    content_type: String,
}

pub struct ZipBackend {
    archive: Mutex<ZipArchive<File>>,
    index: ArchiveIndex<ZipMember>,
}

impl ZipBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let file = File::open(path)
            .map_err(|e| BackendError::Backend(format!("cannot open ZIP file: {e}")))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| BackendError::Backend(format!("cannot open ZIP file: {e}")))?;

        let mut index = ArchiveIndex::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| BackendError::Backend(format!("cannot read ZIP member {i}: {e}")))?;
            let name = entry.name().to_string();
            let segments = member_segments(&name);
            if entry.is_dir() {
                index.add_dir(segments);
            } else {
                let content_type = mime_guess::from_path(&name)
                    .first_raw()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                index.add_file(
                    segments,
                    ZipMember {
                        index: i,
                        size: entry.size(),
                        content_type,
                    },
                );
            }
        }

        Ok(Self {
            archive: Mutex::new(archive),
            index,
        })
    }
}

impl Backend for ZipBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        if self.index.is_dir(path) {
            return Ok(ResourceInfo::dir());
        }
        if let Some(member) = self.index.file(path) {
            return Ok(ResourceInfo::file(member.size, member.content_type.clone()));
        }
        Err(BackendError::not_found(path))
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        if !self.index.is_dir(path) {
            return Err(BackendError::not_found(path));
        }
        Ok(self.index.list(path))
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        let member = self.index.file(path).ok_or_else(|| BackendError::not_found(path))?;
        let mut archive = self.archive.lock().unwrap();
        let mut entry = archive
            .by_index(member.index)
            .map_err(|e| BackendError::Backend(format!("error reading from ZIP: {e}")))?;
        let mut buf = Vec::with_capacity(member.size as usize);
        std::io::copy(&mut entry, &mut buf)
            .map_err(|e| BackendError::Backend(format!("error reading from ZIP: {e}")))?;
        Ok(buf)
    }
}

//! TAR archive backend ([MODULE C]) — mounts `.tar`, `.tar.gz`/`.tgz`,
//! `.tar.bz2`, and `.tar.xz` files. Unlike ZIP, a tar stream cannot be
//! re-read by index once compressed, so member bytes are slurped into
//! memory at construction time and the decoded archive handle is dropped;
//! only the size/content-type/bytes triple is kept per member afterward.

use std::fs::File;
use std::io::Read;
use std::path::Path as FsPath;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::backends::archive::{member_segments, ArchiveIndex};
use crate::path::Segments;

struct TarMember {
    data: Vec<u8>,
    content_type: String,
}

pub struct TarBackend {
    index: ArchiveIndex<TarMember>,
}

fn open_reader(path: &FsPath) -> BackendResult<Box<dyn Read>> {
    let file = File::open(path)
        .map_err(|e| BackendError::Backend(format!("cannot open TAR file: {e}")))?;
    let lower = path.to_string_lossy().to_lowercase();
    let reader: Box<dyn Read> = if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        Box::new(flate2::read::GzDecoder::new(file))
    } else if lower.ends_with(".tar.bz2") {
        Box::new(bzip2::read::BzDecoder::new(file))
    } else if lower.ends_with(".tar.xz") {
        Box::new(xz2::read::XzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

impl TarBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let reader = open_reader(path)?;
        let mut archive = tar::Archive::new(reader);

        let mut index = ArchiveIndex::new();
        let entries = archive
            .entries()
            .map_err(|e| BackendError::Backend(format!("cannot open TAR file: {e}")))?;

        for entry in entries {
            let mut entry =
                entry.map_err(|e| BackendError::Backend(format!("cannot open TAR file: {e}")))?;
            let header = entry.header();
            let name = entry
                .path()
                .map_err(|e| BackendError::Backend(format!("cannot open TAR file: {e}")))?
                .to_string_lossy()
                .to_string();
            let segments = member_segments(&name);

            if header.entry_type().is_dir() {
                index.add_dir(segments);
                continue;
            }
            if !header.entry_type().is_file() {
                // Symlinks and other special members are skipped at
                // construction; reading one would fail anyway (spec §4.C).
                continue;
            }

            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| BackendError::Backend(format!("error reading from TAR: {e}")))?;
            let content_type = mime_guess::from_path(&name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string();
            index.add_file(segments, TarMember { data, content_type });
        }

        Ok(Self { index })
    }
}

impl Backend for TarBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        if self.index.is_dir(path) {
            return Ok(ResourceInfo::dir());
        }
        if let Some(member) = self.index.file(path) {
            return Ok(ResourceInfo::file(
                member.data.len() as u64,
                member.content_type.clone(),
            ));
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
        self.index
            .file(path)
            .map(|m| m.data.clone())
            .ok_or_else(|| BackendError::not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tar(path: &FsPath) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);
        let data = b"hello";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, "a.txt", &data[..]).unwrap();

        let data2 = b"world";
        let mut header2 = tar::Header::new_gnu();
        header2.set_size(data2.len() as u64);
        header2.set_cksum();
        builder
            .append_data(&mut header2, "docs/b.txt", &data2[..])
            .unwrap();
        builder.finish().unwrap();
    }

    #[test]
    fn infers_directories_from_flat_members() {
        let dir = tempfile::tempdir().unwrap();
        let tpath = dir.path().join("t.tar");
        make_tar(&tpath);

        let backend = TarBackend::open(&tpath).unwrap();
        assert!(backend.info(&vec![]).unwrap().is_dir);
        assert!(backend.info(&vec!["docs".to_string()]).unwrap().is_dir);
        assert_eq!(backend.get(&vec!["a.txt".to_string()]).unwrap(), b"hello");
    }

    #[test]
    fn broken_archive_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tar");
        std::fs::write(&path, b"not a tar").unwrap();
        assert!(TarBackend::open(&path).is_err());
    }
}

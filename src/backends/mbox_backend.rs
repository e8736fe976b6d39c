//! Message-store backend ([MODULE H]) — mounts an mbox file as a flat,
//! insertion-ordered set of `.eml` files, one per message.

use std::collections::HashMap;
use std::path::Path as FsPath;

use mailparse::MailHeaderMap;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

/// Split raw mbox content on lines starting with `From `, discarding the
/// envelope line itself. No unescaping of `>From` body lines is needed
/// since they never match the delimiter.
fn split_messages(content: &str) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = String::new();
    let mut started = false;
    for line in content.split_inclusive('\n') {
        if line.starts_with("From ") {
            if started {
                messages.push(std::mem::take(&mut current));
            }
            started = true;
            continue;
        }
        if started {
            current.push_str(line);
        }
    }
    if started {
        messages.push(current);
    }
    messages
}

fn safe_filename(subject: &str) -> String {
    let filtered: String = subject
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-' || *c == '.')
        .collect();

    let mut collapsed = String::new();
    let mut last_was_space = false;
    for c in filtered.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                collapsed.push('_');
            }
            last_was_space = true;
        } else {
            collapsed.push(c);
            last_was_space = false;
        }
    }

    let truncated: String = collapsed.chars().take(60).collect();
    if truncated.is_empty() {
        "no_subject".to_string()
    } else {
        truncated
    }
}

pub struct MboxBackend {
    order: Vec<String>,
    contents: HashMap<String, Vec<u8>>,
}

impl MboxBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| BackendError::Backend(format!("cannot open mailbox: {e}")))?;
        let text = String::from_utf8_lossy(&raw);
        let messages = split_messages(&text);

        let width = std::cmp::max(4, messages.len().to_string().len());
        let mut order = Vec::with_capacity(messages.len());
        let mut contents = HashMap::with_capacity(messages.len());
        let mut used: HashMap<String, usize> = HashMap::new();

        for (i, message) in messages.iter().enumerate() {
            let parsed = mailparse::parse_mail(message.as_bytes())
                .map_err(|e| BackendError::Backend(format!("cannot parse message {i}: {e}")))?;
            let subject = parsed
                .headers
                .get_first_value("Subject")
                .unwrap_or_else(|| "no_subject".to_string());
            let safe = safe_filename(&subject);

            let mut name = format!("{i:0width$}_{safe}.eml", i = i, width = width);
            let discriminator = used.entry(name.clone()).or_insert(0);
            if *discriminator > 0 {
                name = format!("{i:0width$}_{safe}_{n}.eml", i = i, width = width, n = discriminator);
            }
            *discriminator += 1;

            order.push(name.clone());
            contents.insert(name, message.clone().into_bytes());
        }

        Ok(Self { order, contents })
    }
}

impl Backend for MboxBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match path.as_slice() {
            [] => Ok(ResourceInfo::dir()),
            [name] => {
                let data = self
                    .contents
                    .get(name)
                    .ok_or_else(|| BackendError::not_found(path))?;
                Ok(ResourceInfo::file(data.len() as u64, "message/rfc822"))
            }
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match path.as_slice() {
            [] => Ok(self.order.clone()),
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match path.as_slice() {
            [name] => self
                .contents
                .get(name)
                .cloned()
                .ok_or_else(|| BackendError::not_found(path)),
            _ => Err(BackendError::not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, MboxBackend) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mbox");
        std::fs::write(
            &path,
            "From alice@example.com Mon Jan  1 00:00:00 2024\n\
             Subject: Hello, World!\n\
             \n\
             body one\n\
             From bob@example.com Mon Jan  1 00:01:00 2024\n\
             Subject: \n\
             \n\
             body two\n",
        )
        .unwrap();
        let backend = MboxBackend::open(&path).unwrap();
        (dir, backend)
    }

    #[test]
    fn listing_is_insertion_ordered_not_sorted() {
        let (_dir, backend) = fixture();
        let entries = backend.list(&vec![]).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("0000_"));
        assert!(entries[1].starts_with("0001_"));
    }

    #[test]
    fn subject_is_sanitized_into_filename() {
        let (_dir, backend) = fixture();
        let entries = backend.list(&vec![]).unwrap();
        assert_eq!(entries[0], "0000_Hello_World.eml");
    }

    #[test]
    fn empty_subject_falls_back_to_no_subject() {
        let (_dir, backend) = fixture();
        let entries = backend.list(&vec![]).unwrap();
        assert_eq!(entries[1], "0001_no_subject.eml");
    }

    #[test]
    fn get_returns_full_message_bytes() {
        let (_dir, backend) = fixture();
        let entries = backend.list(&vec![]).unwrap();
        let path = vec![entries[0].clone()];
        let data = backend.get(&path).unwrap();
        assert!(String::from_utf8_lossy(&data).contains("body one"));
    }
}

//! CSV row-store backend ([MODULE E]) — mounts a `.csv` file. The first row
//! is the header; each data row becomes a `row_NNNN/` directory of
//! per-column files, with `NNNN` zero-padded wide enough that lexicographic
//! sort matches numeric sort.

use std::path::Path as FsPath;

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

const HEADERS_FILE: &str = "_headers.txt";

pub struct CsvBackend {
    headers: Vec<String>,
    headers_bytes: Vec<u8>,
    rows: Vec<Vec<String>>,
    width: usize,
}

impl CsvBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| BackendError::Backend(format!("cannot read CSV file: {e}")))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| BackendError::Backend(format!("cannot read CSV file: {e}")))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| BackendError::Backend(format!("cannot read CSV file: {e}")))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        let headers_bytes = headers.join("\n").into_bytes();
        let width = std::cmp::max(4, rows.len().to_string().len());

        Ok(Self {
            headers,
            headers_bytes,
            rows,
            width,
        })
    }

    fn row_dirname(&self, index: usize) -> String {
        format!("row_{:0width$}", index, width = self.width)
    }

    fn parse_row_name(&self, name: &str) -> Option<usize> {
        name.strip_prefix("row_").and_then(|n| n.parse().ok())
    }

    fn cell(&self, row_idx: usize, column: &str) -> Option<&str> {
        let col_idx = self.headers.iter().position(|h| h == column)?;
        let row = self.rows.get(row_idx)?;
        Some(row.get(col_idx).map(|s| s.as_str()).unwrap_or(""))
    }
}

impl Backend for CsvBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match path.as_slice() {
            [] => Ok(ResourceInfo::dir()),
            [name] if name == HEADERS_FILE => Ok(ResourceInfo::file(
                self.headers_bytes.len() as u64,
                "text/plain",
            )),
            [name] => match self.parse_row_name(name) {
                Some(idx) if idx < self.rows.len() => Ok(ResourceInfo::dir()),
                _ => Err(BackendError::not_found(path)),
            },
            [row_name, column] => {
                let idx = self
                    .parse_row_name(row_name)
                    .filter(|i| *i < self.rows.len())
                    .ok_or_else(|| BackendError::not_found(path))?;
                let value = self
                    .cell(idx, column)
                    .ok_or_else(|| BackendError::not_found(path))?;
                Ok(ResourceInfo::file(value.len() as u64, "text/plain"))
            }
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match path.as_slice() {
            [] => {
                let mut entries = vec![HEADERS_FILE.to_string()];
                entries.extend((0..self.rows.len()).map(|i| self.row_dirname(i)));
                Ok(entries)
            }
            [name] => match self.parse_row_name(name) {
                Some(idx) if idx < self.rows.len() => Ok(self.headers.clone()),
                _ => Err(BackendError::not_found(path)),
            },
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match path.as_slice() {
            [name] if name == HEADERS_FILE => Ok(self.headers_bytes.clone()),
            [row_name, column] => {
                let idx = self
                    .parse_row_name(row_name)
                    .filter(|i| *i < self.rows.len())
                    .ok_or_else(|| BackendError::not_found(path))?;
                let value = self
                    .cell(idx, column)
                    .ok_or_else(|| BackendError::not_found(path))?;
                Ok(value.as_bytes().to_vec())
            }
            _ => Err(BackendError::not_found(path)),
        }
    }
}

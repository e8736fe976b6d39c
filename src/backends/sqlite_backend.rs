//! SQLite row-store backend ([MODULE E]) — mounts a `.db`/`.sqlite` file.
//! The namespace is three levels deep: `/<table>/_schema.sql` and
//! `/<table>/row_<n>/<column>`. The connection is opened read-only and
//! serialized behind a mutex since `rusqlite::Connection` is `!Sync`.

use std::path::Path as FsPath;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use crate::backend::{Backend, BackendError, BackendResult, ResourceInfo};
use crate::path::Segments;

const SCHEMA_FILE: &str = "_schema.sql";

pub struct SqliteBackend {
    conn: Mutex<Connection>,
    tables: Vec<String>,
    columns: std::collections::HashMap<String, Vec<String>>,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl SqliteBackend {
    pub fn open(path: &FsPath) -> BackendResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| BackendError::Backend(format!("cannot open SQLite database: {e}")))?;

        let mut tables = Vec::new();
        {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .map_err(|e| BackendError::Backend(format!("cannot read database schema: {e}")))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| BackendError::Backend(format!("cannot read database schema: {e}")))?;
            for row in rows {
                tables.push(row.map_err(|e| {
                    BackendError::Backend(format!("cannot read database schema: {e}"))
                })?);
            }
        }

        let mut columns = std::collections::HashMap::new();
        for table in &tables {
            let mut stmt = conn
                .prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table)))
                .map_err(|e| BackendError::Backend(format!("cannot read table {table}: {e}")))?;
            let names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            columns.insert(table.clone(), names);
        }

        Ok(Self {
            conn: Mutex::new(conn),
            tables,
            columns,
        })
    }

    fn schema_sql(&self, table: &str) -> BackendResult<String> {
        let conn = self.conn.lock().unwrap();
        let sql: String = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| BackendError::Backend(format!("cannot read schema for {table}: {e}")))?;
        Ok(format!("{sql};\n"))
    }

    fn row_count(&self, table: &str) -> BackendResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |row| {
                row.get(0)
            })
            .map_err(|e| BackendError::Backend(format!("error reading table {table}: {e}")))?;
        Ok(count as usize)
    }

    fn cell_value(&self, table: &str, row_index: usize, column: &str) -> BackendResult<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM {} LIMIT 1 OFFSET ?1",
            quote_ident(column),
            quote_ident(table)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| BackendError::Backend(format!("error reading from database: {e}")))?;
        let mut rows = stmt
            .query([row_index as i64])
            .map_err(|e| BackendError::Backend(format!("error reading from database: {e}")))?;
        let Some(row) = rows
            .next()
            .map_err(|e| BackendError::Backend(format!("error reading from database: {e}")))?
        else {
            return Ok(None);
        };
        let value: rusqlite::types::ValueRef = row
            .get_ref(0)
            .map_err(|e| BackendError::Backend(format!("error reading from database: {e}")))?;
        Ok(Some(render_cell(value)))
    }
}

fn render_cell(value: rusqlite::types::ValueRef) -> Vec<u8> {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => Vec::new(),
        ValueRef::Integer(i) => i.to_string().into_bytes(),
        ValueRef::Real(f) => f.to_string().into_bytes(),
        ValueRef::Text(t) => t.to_vec(),
        ValueRef::Blob(b) => b.to_vec(),
    }
}

impl Backend for SqliteBackend {
    fn info(&self, path: &Segments) -> BackendResult<ResourceInfo> {
        match path.as_slice() {
            [] => Ok(ResourceInfo::dir()),
            [table] => {
                if self.tables.contains(table) {
                    Ok(ResourceInfo::dir())
                } else {
                    Err(BackendError::not_found(path))
                }
            }
            [table, name] if name == SCHEMA_FILE => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                let sql = self.schema_sql(table)?;
                Ok(ResourceInfo::file(sql.len() as u64, "text/plain"))
            }
            [table, row_name] => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                let idx = parse_row_name(row_name).ok_or_else(|| BackendError::not_found(path))?;
                if idx < self.row_count(table)? {
                    Ok(ResourceInfo::dir())
                } else {
                    Err(BackendError::not_found(path))
                }
            }
            [table, row_name, column] => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                let idx = parse_row_name(row_name).ok_or_else(|| BackendError::not_found(path))?;
                if idx >= self.row_count(table)? {
                    return Err(BackendError::not_found(path));
                }
                let columns = &self.columns[table];
                if !columns.contains(column) {
                    return Err(BackendError::not_found(path));
                }
                let value = self
                    .cell_value(table, idx, column)?
                    .ok_or_else(|| BackendError::not_found(path))?;
                Ok(ResourceInfo::file(value.len() as u64, "text/plain"))
            }
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn list(&self, path: &Segments) -> BackendResult<Vec<String>> {
        match path.as_slice() {
            [] => Ok(self.tables.clone()),
            [table] => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                let count = self.row_count(table)?;
                let mut entries = vec![SCHEMA_FILE.to_string()];
                entries.extend((0..count).map(row_dirname));
                Ok(entries)
            }
            [table, row_name] => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                let idx = parse_row_name(row_name).ok_or_else(|| BackendError::not_found(path))?;
                if idx >= self.row_count(table)? {
                    return Err(BackendError::not_found(path));
                }
                Ok(self.columns[table].clone())
            }
            _ => Err(BackendError::not_found(path)),
        }
    }

    fn get(&self, path: &Segments) -> BackendResult<Vec<u8>> {
        match path.as_slice() {
            [table, name] if name == SCHEMA_FILE => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                Ok(self.schema_sql(table)?.into_bytes())
            }
            [table, row_name, column] => {
                if !self.tables.contains(table) {
                    return Err(BackendError::not_found(path));
                }
                let idx = parse_row_name(row_name).ok_or_else(|| BackendError::not_found(path))?;
                if idx >= self.row_count(table)? {
                    return Err(BackendError::not_found(path));
                }
                if !self.columns[table].contains(column) {
                    return Err(BackendError::not_found(path));
                }
                self.cell_value(table, idx, column)?
                    .ok_or_else(|| BackendError::not_found(path))
            }
            _ => Err(BackendError::not_found(path)),
        }
    }
}

fn row_dirname(index: usize) -> String {
    format!("row_{index}")
}

fn parse_row_name(name: &str) -> Option<usize> {
    name.strip_prefix("row_").and_then(|n| n.parse().ok())
}

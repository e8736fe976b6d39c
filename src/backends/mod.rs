//! Backend adapters ([MODULE C]–[MODULE J]) and the extension-based
//! dispatch table that selects one for a mounted file.

mod archive;
mod ast_backend;
mod csv_backend;
mod element_tree;
mod html_backend;
mod ini_backend;
mod json_backend;
pub mod osinfo_backend;
mod sqlite_backend;
mod tar_backend;
mod toml_backend;
mod xml_backend;
mod zip_backend;
mod mbox_backend;

use std::path::Path;

use crate::backend::{Backend, BackendError, BackendResult};

/// One entry per supported file format. Order here does not matter for
/// dispatch (extensions are tried longest-first); it does determine the
/// order extensions are listed in an "unsupported extension" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Zip,
    Tar,
    Sqlite,
    Json,
    Csv,
    Ini,
    Xml,
    Html,
    Mbox,
    Ast,
    Toml,
}

impl BackendKind {
    /// Short name used by the `-t/--type` override, matching each Python
    /// class name with the `Backend` suffix stripped and lowercased.
    fn type_name(self) -> &'static str {
        match self {
            BackendKind::Zip => "zip",
            BackendKind::Tar => "tar",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Json => "json",
            BackendKind::Csv => "csv",
            BackendKind::Ini => "ini",
            BackendKind::Xml => "xml",
            BackendKind::Html => "html",
            BackendKind::Mbox => "mailbox",
            BackendKind::Ast => "ast",
            BackendKind::Toml => "toml",
        }
    }

    fn open(self, path: &Path) -> BackendResult<Box<dyn Backend>> {
        Ok(match self {
            BackendKind::Zip => Box::new(zip_backend::ZipBackend::open(path)?),
            BackendKind::Tar => Box::new(tar_backend::TarBackend::open(path)?),
            BackendKind::Sqlite => Box::new(sqlite_backend::SqliteBackend::open(path)?),
            BackendKind::Json => Box::new(json_backend::JsonBackend::open(path)?),
            BackendKind::Csv => Box::new(csv_backend::CsvBackend::open(path)?),
            BackendKind::Ini => Box::new(ini_backend::IniBackend::open(path)?),
            BackendKind::Xml => Box::new(xml_backend::XmlBackend::open(path)?),
            BackendKind::Html => Box::new(html_backend::HtmlBackend::open(path)?),
            BackendKind::Mbox => Box::new(mbox_backend::MboxBackend::open(path)?),
            BackendKind::Ast => Box::new(ast_backend::AstBackend::open(path)?),
            BackendKind::Toml => Box::new(toml_backend::TomlBackend::open(path)?),
        })
    }
}

/// Extension table, longest extension first so compound extensions like
/// `.tar.gz` are matched before the bare `.tar` they also end with.
const EXTENSIONS: &[(&str, BackendKind)] = &[
    (".tar.bz2", BackendKind::Tar),
    (".tar.gz", BackendKind::Tar),
    (".tar.xz", BackendKind::Tar),
    (".sqlite3", BackendKind::Sqlite),
    (".sqlite", BackendKind::Sqlite),
    (".mbox", BackendKind::Mbox),
    (".html", BackendKind::Html),
    (".toml", BackendKind::Toml),
    (".json", BackendKind::Json),
    (".csv", BackendKind::Csv),
    (".ini", BackendKind::Ini),
    (".cfg", BackendKind::Ini),
    (".xml", BackendKind::Xml),
    (".htm", BackendKind::Html),
    (".tgz", BackendKind::Tar),
    (".tar", BackendKind::Tar),
    (".zip", BackendKind::Zip),
    (".db", BackendKind::Sqlite),
    (".py", BackendKind::Ast),
];

fn detect(path: &Path) -> Option<BackendKind> {
    let lower = path.to_string_lossy().to_lowercase();
    EXTENSIONS
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, kind)| *kind)
}

fn by_type_name(name: &str) -> Option<BackendKind> {
    let normalized = name.to_lowercase().replace("backend", "");
    [
        BackendKind::Zip,
        BackendKind::Tar,
        BackendKind::Sqlite,
        BackendKind::Json,
        BackendKind::Csv,
        BackendKind::Ini,
        BackendKind::Xml,
        BackendKind::Html,
        BackendKind::Mbox,
        BackendKind::Ast,
        BackendKind::Toml,
    ]
    .into_iter()
    .find(|kind| kind.type_name() == normalized)
}

/// Select and open a backend for `path`. `forced_type` overrides extension
/// detection (the `-t/--type` CLI flag).
pub fn load(path: &Path, forced_type: Option<&str>) -> BackendResult<Box<dyn Backend>> {
    let kind = if let Some(type_name) = forced_type {
        by_type_name(type_name)
            .ok_or_else(|| BackendError::Backend(format!("Unknown backend type: {type_name}")))?
    } else {
        detect(path).ok_or_else(|| {
            let supported: Vec<&str> = EXTENSIONS.iter().map(|(ext, _)| *ext).collect();
            BackendError::Backend(format!(
                "Cannot detect backend for '{}'. Supported extensions: {}",
                path.display(),
                supported.join(", ")
            ))
        })?
    };
    kind.open(path)
}

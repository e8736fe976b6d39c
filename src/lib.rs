//! Library crate backing the `davall` binary: the abstract resource layer,
//! the backend adapters, and the WebDAV front end. Split out from `main.rs`
//! so integration tests can drive the HTTP surface and individual backends
//! directly, the way `codescope_server` exposes its internals to `tests/`.

pub mod backend;
pub mod backends;
pub mod path;
pub mod webdav;

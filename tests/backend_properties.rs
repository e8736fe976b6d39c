//! Property-style checks pinning the universal backend contract from
//! spec §8 ([MODULE M]): every backend, regardless of source format, must
//! satisfy these regardless of its internal representation.

use davall::backend::{Backend, MemoryBackend, MemoryNode};
use davall::path::Segments;

/// Recursively walk every path reachable from `root` and check the
/// info/list/get contract at each one.
fn check_contract(backend: &dyn Backend) {
    assert!(
        backend.info(&Vec::new()).unwrap().is_dir,
        "root must always be a directory"
    );
    walk(backend, &Vec::new());
}

fn walk(backend: &dyn Backend, path: &Segments) {
    let info = backend.info(path).unwrap();
    if info.is_dir {
        let children = backend.list(path).unwrap();
        assert!(backend.get(path).is_err(), "reading a directory must fail");

        let mut sorted = children.clone();
        sorted.sort();
        let mut deduped = sorted.clone();
        deduped.dedup();
        assert_eq!(sorted, deduped, "no duplicate child names in {path:?}");

        for name in &children {
            let child = davall::path::join(path, name);
            backend
                .info(&child)
                .unwrap_or_else(|e| panic!("child {child:?} reported by list() must exist: {e}"));
            walk(backend, &child);
        }
    } else {
        let data = backend.get(path).unwrap();
        assert_eq!(data.len() as u64, info.size, "size must equal get().len()");
        assert!(backend.list(path).is_err(), "listing a file must fail");
    }
}

fn fabricated_name_is_not_found(backend: &dyn Backend) {
    let bogus = vec!["__this_name_should_not_exist__".to_string()];
    assert!(backend.info(&bogus).is_err());
}

#[test]
fn memory_backend_satisfies_the_universal_contract() {
    let backend = MemoryBackend::new(MemoryNode::dir([
        ("hello.txt", MemoryNode::text("Hello, world!")),
        (
            "docs",
            MemoryNode::dir([
                ("guide.txt", MemoryNode::text("A guide")),
                ("empty.txt", MemoryNode::text("")),
            ]),
        ),
        ("nested", MemoryNode::dir([("a", MemoryNode::dir([]))])),
    ]));
    check_contract(&backend);
    fabricated_name_is_not_found(&backend);
}

#[test]
fn json_backend_satisfies_the_universal_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.json");
    std::fs::write(
        &path,
        r#"{"a": 1, "b": [true, null, "x", {"nested": "y"}], "c": {}}"#,
    )
    .unwrap();
    let backend = davall::backends::load(&path, Some("json")).unwrap();
    check_contract(backend.as_ref());
    fabricated_name_is_not_found(backend.as_ref());
}

#[test]
fn ini_backend_satisfies_the_universal_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.ini");
    std::fs::write(&path, "[a]\nk1 = v1\nk2 = v2\n\n[b]\nk3 = v3\n").unwrap();
    let backend = davall::backends::load(&path, Some("ini")).unwrap();
    check_contract(backend.as_ref());
    fabricated_name_is_not_found(backend.as_ref());
}

#[test]
fn path_roundtrip_is_identity_on_canonical_input() {
    for raw in ["/", "/a", "/a/b/c", "/x/y"] {
        let segments = davall::path::split(raw);
        assert_eq!(davall::path::to_string(&segments), raw);
    }
}

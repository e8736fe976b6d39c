//! End-to-end HTTP scenarios against the WebDAV front end ([MODULE K]),
//! pinned to the literal expectations a client would observe — a real
//! `TcpListener` bound to an ephemeral port, driven with `reqwest`.

use std::sync::Arc;

use davall::backend::{Backend, MemoryBackend, MemoryNode};
use davall::webdav;

async fn spawn(backend: Arc<dyn Backend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = webdav::router(backend);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fixture_backend() -> Arc<dyn Backend> {
    Arc::new(MemoryBackend::new(MemoryNode::dir([
        ("hello.txt", MemoryNode::text("Hello, world!")),
        (
            "docs",
            MemoryNode::dir([("guide.txt", MemoryNode::text("A guide"))]),
        ),
    ])))
}

#[tokio::test]
async fn options_reports_allowed_methods_and_dav_header() {
    let base = spawn(fixture_backend()).await;
    let client = reqwest::Client::new();
    let resp = client
        .request(reqwest::Method::OPTIONS, &base)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let allow = resp.headers().get("allow").unwrap().to_str().unwrap();
    assert_eq!(allow, "OPTIONS, GET, HEAD, PROPFIND");
    assert_eq!(resp.headers().get("dav").unwrap(), "1");
}

#[tokio::test]
async fn get_file_returns_body_and_content_length() {
    let base = spawn(fixture_backend()).await;
    let resp = reqwest::get(format!("{base}/hello.txt")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-length").unwrap(), "13");
    assert_eq!(resp.text().await.unwrap(), "Hello, world!");
}

#[tokio::test]
async fn propfind_depth_one_lists_target_and_immediate_children() {
    let base = spawn(fixture_backend()).await;
    let client = reqwest::Client::new();
    let resp = client
        .request(reqwest::Method::from_bytes(b"PROPFIND").unwrap(), &base)
        .header("Depth", "1")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 207);
    let body = resp.text().await.unwrap();
    let count = body.matches("<D:response>").count();
    assert_eq!(count, 3, "expected one response each for /, /docs/, /hello.txt: {body}");
    assert!(body.contains("<D:href>/</D:href>"));
    assert!(body.contains("<D:href>/docs/</D:href>"));
    assert!(body.contains("<D:href>/hello.txt</D:href>"));
}

#[tokio::test]
async fn propfind_depth_zero_yields_a_single_response() {
    let base = spawn(fixture_backend()).await;
    let client = reqwest::Client::new();
    let resp = client
        .request(reqwest::Method::from_bytes(b"PROPFIND").unwrap(), &base)
        .header("Depth", "0")
        .send()
        .await
        .unwrap();

    let body = resp.text().await.unwrap();
    assert_eq!(body.matches("<D:response>").count(), 1);
}

#[tokio::test]
async fn json_dump_of_a_subdirectory() {
    let base = spawn(fixture_backend()).await;
    let resp = reqwest::get(format!("{base}/docs?json")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json; charset=utf-8"
    );
    let value: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(value, serde_json::json!({"guide.txt": "A guide"}));
}

#[tokio::test]
async fn zip_dump_of_root_contains_every_file_with_relative_paths() {
    let base = spawn(fixture_backend()).await;
    let resp = reqwest::get(format!("{base}/?zip")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/zip");
    let bytes = resp.bytes().await.unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

    let mut contents = std::collections::HashMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let name = entry.name().to_string();
        let mut data = String::new();
        std::io::Read::read_to_string(&mut entry, &mut data).unwrap();
        contents.insert(name, data);
    }
    assert_eq!(contents.get("hello.txt").unwrap(), "Hello, world!");
    assert_eq!(contents.get("docs/guide.txt").unwrap(), "A guide");
}

#[tokio::test]
async fn put_is_rejected_with_allow_header() {
    let base = spawn(fixture_backend()).await;
    let client = reqwest::Client::new();
    let resp = client
        .put(format!("{base}/new.txt"))
        .body("data")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers().get("allow").unwrap(), "OPTIONS, GET, HEAD, PROPFIND");
}

#[tokio::test]
async fn other_mutating_verbs_are_also_rejected() {
    let base = spawn(fixture_backend()).await;
    let client = reqwest::Client::new();
    for method in ["DELETE", "MKCOL", "PROPPATCH", "MOVE", "COPY", "LOCK", "UNLOCK", "POST", "PATCH"] {
        let resp = client
            .request(reqwest::Method::from_bytes(method.as_bytes()).unwrap(), &base)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 405, "{method} should be rejected");
    }
}

#[tokio::test]
async fn missing_resource_is_404() {
    let base = spawn(fixture_backend()).await;
    let resp = reqwest::get(format!("{base}/nope.txt")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn head_matches_get_headers_without_a_body() {
    let base = spawn(fixture_backend()).await;
    let client = reqwest::Client::new();
    let resp = client
        .head(format!("{base}/hello.txt"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-length").unwrap(), "13");
    assert_eq!(resp.bytes().await.unwrap().len(), 0);
}

#[tokio::test]
async fn directory_index_links_children_with_percent_encoded_hrefs() {
    let backend = Arc::new(MemoryBackend::new(MemoryNode::dir([(
        "a b.txt",
        MemoryNode::text("x"),
    )])));
    let base = spawn(backend).await;
    let resp = reqwest::get(&base).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("href=\"a%20b.txt\""));
    assert!(body.contains(">a b.txt<"));
    assert!(body.contains("<h1>/</h1>"));
}

#[tokio::test]
async fn directory_index_heading_shows_the_current_path() {
    let base = spawn(fixture_backend()).await;
    let resp = reqwest::get(format!("{base}/docs")).await.unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<h1>/docs</h1>"));
    assert!(body.contains("href=\"../\">..</a>"));
}

use super::*;
use crate::parser::{FAILURE_WARNING, TIMEOUT_WARNING, WARNING_FIELD};
use axum::http::StatusCode;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn uri(s: &str) -> Uri {
    s.parse().unwrap()
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs/notes.txt"), b"hello world").unwrap();
    std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.7").unwrap();
    std::fs::write(dir.path().join("Makefile"), b"all:").unwrap();
    dir
}

fn test_config() -> ServerConfig {
    ServerConfig::new().debug(true).parser_timeout_ms(100)
}

fn body(dispatch: Dispatch) -> Value {
    dispatch.response().expect("handler should respond").body
}

async fn pdf_parser(_path: PathBuf) -> anyhow::Result<Fields> {
    match json!({ "pages": 12, "title": "Q3" }) {
        Value::Object(map) => Ok(map),
        _ => unreachable!(),
    }
}

// ============================================================================
// Request claiming
// ============================================================================

#[tokio::test]
async fn test_without_meta_marker_is_unhandled() {
    let dir = fixture();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    assert_eq!(handler.handle(&uri("/docs/notes.txt")).await, Dispatch::Unhandled);
    assert_eq!(
        handler.handle(&uri("/docs/notes.txt?meta=")).await,
        Dispatch::Unhandled
    );
    assert_eq!(
        handler.handle(&uri("/docs/notes.txt?download=1")).await,
        Dispatch::Unhandled
    );
}

#[tokio::test]
async fn test_any_non_empty_meta_value_is_claimed() {
    let dir = fixture();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    for query in ["meta=0", "meta=false", "meta=0&meta=1", "meta=&meta=yes"] {
        let dispatch = handler.handle(&uri(&format!("/docs/notes.txt?{query}"))).await;
        assert_eq!(dispatch.status(), Some(StatusCode::OK), "query {query}");
        assert_eq!(body(dispatch)["size"], 11);
    }
}

#[tokio::test]
async fn test_missing_file_is_unhandled() {
    let dir = fixture();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    let dispatch = handler.handle(&uri("/docs/missing.txt?meta=1")).await;
    assert_eq!(dispatch, Dispatch::Unhandled);
    assert!(!dispatch.is_handled());
}

#[tokio::test]
async fn test_malformed_encoding_is_unhandled() {
    let dir = fixture();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    let dispatch = handler.handle(&uri("/docs/%E0%A4%A.txt?meta=1")).await;
    assert_eq!(dispatch, Dispatch::Unhandled);
}

// ============================================================================
// Base metadata
// ============================================================================

#[tokio::test]
async fn test_base_metadata() {
    let dir = fixture();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    let dispatch = handler.handle(&uri("/docs/notes.txt?meta=1")).await;
    assert_eq!(dispatch.status(), Some(StatusCode::OK));

    let body = body(dispatch);
    let keys: Vec<&str> = body.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["size", "created", "modified", "type"]);
    assert_eq!(body["size"], 11);
    assert_eq!(body["type"], ".txt");
    assert!(body["modified"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_percent_encoded_path() {
    let dir = fixture();
    std::fs::write(dir.path().join("my file.txt"), b"spaced").unwrap();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    let body = body(handler.handle(&uri("/my%20file.txt?meta=true")).await);
    assert_eq!(body["size"], 6);
}

#[tokio::test]
async fn test_file_without_extension() {
    let dir = fixture();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    let body = body(handler.handle(&uri("/Makefile?meta=1")).await);
    assert_eq!(body["type"], "");
}

#[tokio::test]
async fn test_repeated_requests_are_byte_identical() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    server.register("pdf", pdf_parser);
    let handler = server.handler(dir.path()).unwrap();

    let first = handler.handle(&uri("/report.pdf?meta=1")).await.response().unwrap();
    let second = handler.handle(&uri("/report.pdf?meta=1")).await.response().unwrap();
    assert_eq!(first.to_bytes(), second.to_bytes());
}

// ============================================================================
// Path rejection
// ============================================================================

#[tokio::test]
async fn test_traversal_outside_root_is_forbidden() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("public");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

    let handler = MetaServe::new(test_config()).handler(&root).unwrap();

    for path in ["/../secret.txt?meta=1", "/%2E%2E/secret.txt?meta=1"] {
        let dispatch = handler.handle(&uri(path)).await;
        assert_eq!(dispatch.status(), Some(StatusCode::FORBIDDEN), "path {path}");
        assert_eq!(body(dispatch), json!({ "error": "Access denied" }));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_is_forbidden_and_parser_not_run() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("public");
    std::fs::create_dir(&root).unwrap();
    let secret = outer.path().join("secret.pdf");
    std::fs::write(&secret, b"secret").unwrap();
    std::os::unix::fs::symlink(&secret, root.join("looks-safe.pdf")).unwrap();

    let touched = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&touched);
    let mut server = MetaServe::new(test_config());
    server.register("pdf", move |_path: PathBuf| {
        flag.store(true, Ordering::SeqCst);
        async { Ok::<_, anyhow::Error>(Fields::new()) }
    });
    let handler = server.handler(&root).unwrap();

    let dispatch = handler.handle(&uri("/looks-safe.pdf?meta=1")).await;
    assert_eq!(dispatch.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(body(dispatch), json!({ "error": "Access denied" }));
    assert!(!touched.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_absolute_request_path_stays_under_root() {
    let dir = fixture();
    std::fs::create_dir_all(dir.path().join("etc")).unwrap();
    std::fs::write(dir.path().join("etc/hosts"), b"local").unwrap();
    let handler = MetaServe::new(test_config()).handler(dir.path()).unwrap();

    let body = body(handler.handle(&uri("//etc/hosts?meta=1")).await);
    assert_eq!(body["size"], 5);
}

// ============================================================================
// Size limit
// ============================================================================

#[tokio::test]
async fn test_oversized_file_rejected_before_parser() {
    let dir = fixture();
    std::fs::write(dir.path().join("huge.pdf"), vec![b'x'; 64]).unwrap();

    let touched = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&touched);
    let mut server = MetaServe::new(test_config().max_file_size(32));
    server.register("pdf", move |_path: PathBuf| {
        flag.store(true, Ordering::SeqCst);
        async { Ok::<_, anyhow::Error>(Fields::new()) }
    });
    let handler = server.handler(dir.path()).unwrap();

    let dispatch = handler.handle(&uri("/huge.pdf?meta=1")).await;
    assert_eq!(dispatch.status(), Some(StatusCode::PAYLOAD_TOO_LARGE));
    assert_eq!(body(dispatch), json!({ "error": "File too large", "limit": 32 }));
    assert!(!touched.load(Ordering::SeqCst));
}

// ============================================================================
// Parser stage
// ============================================================================

#[tokio::test]
async fn test_parser_fields_merged() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    server.register("PDF", pdf_parser);
    let handler = server.handler(dir.path()).unwrap();

    let body = body(handler.handle(&uri("/report.pdf?meta=1")).await);
    assert_eq!(body["size"], 8);
    assert_eq!(body["type"], ".pdf");
    assert_eq!(body["pages"], 12);
    assert_eq!(body["title"], "Q3");
    assert!(body.get(WARNING_FIELD).is_none());
}

#[tokio::test]
async fn test_parser_may_overwrite_base_fields() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    server.register("pdf", |_path: PathBuf| async {
        match json!({ "size": -1 }) {
            Value::Object(map) => Ok::<_, anyhow::Error>(map),
            _ => unreachable!(),
        }
    });
    let handler = server.handler(dir.path()).unwrap();

    let body = body(handler.handle(&uri("/report.pdf?meta=1")).await);
    assert_eq!(body["size"], -1);
}

#[tokio::test]
async fn test_parser_timeout_degrades_to_warning() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    server.register("pdf", |_path: PathBuf| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<_, anyhow::Error>(Fields::new())
    });
    let handler = server.handler(dir.path()).unwrap();

    let dispatch = handler.handle(&uri("/report.pdf?meta=1")).await;
    assert_eq!(dispatch.status(), Some(StatusCode::OK));
    let body = body(dispatch);
    assert_eq!(body["size"], 8);
    assert_eq!(body[WARNING_FIELD], TIMEOUT_WARNING);
}

#[tokio::test]
async fn test_parser_failure_degrades_to_warning() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    server.register("pdf", |_path: PathBuf| async {
        Err::<Fields, _>(anyhow::anyhow!("truncated xref table"))
    });
    let handler = server.handler(dir.path()).unwrap();

    let dispatch = handler.handle(&uri("/report.pdf?meta=1")).await;
    assert_eq!(dispatch.status(), Some(StatusCode::OK));
    let body = body(dispatch);
    assert_eq!(body["type"], ".pdf");
    assert_eq!(body[WARNING_FIELD], FAILURE_WARNING);
}

#[tokio::test]
async fn test_unregistered_extension_has_no_warning() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    server.register("pdf", pdf_parser);
    let handler = server.handler(dir.path()).unwrap();

    let body = body(handler.handle(&uri("/docs/notes.txt?meta=1")).await);
    assert_eq!(body.as_object().unwrap().len(), 4);
}

#[tokio::test]
async fn test_handler_snapshots_registry() {
    let dir = fixture();
    let mut server = MetaServe::new(test_config());
    let before = server.handler(dir.path()).unwrap();
    server.register("pdf", pdf_parser);
    let after = server.handler(dir.path()).unwrap();

    let body_before = body(before.handle(&uri("/report.pdf?meta=1")).await);
    let body_after = body(after.handle(&uri("/report.pdf?meta=1")).await);
    assert!(body_before.get("pages").is_none());
    assert_eq!(body_after["pages"], 12);
}

// ============================================================================
// Error classification
// ============================================================================

#[test]
fn test_error_status_mapping() {
    let denied = MetaError::AccessDenied {
        path: PathBuf::from("/etc/passwd"),
    };
    let too_large = MetaError::FileTooLarge { size: 10, limit: 5 };
    let invalid = MetaError::InvalidRequestPath("bad".to_string());

    assert_eq!(denied.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(too_large.status(), Some(StatusCode::PAYLOAD_TOO_LARGE));
    assert_eq!(invalid.status(), None);
    assert_eq!(invalid.into_dispatch(), Dispatch::Unhandled);
}

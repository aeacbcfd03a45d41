//! Integration tests for the REST surface, driven through the router with
//! the local backend in a temp directory.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use files_api::api::rest::router;
use files_api::api::rest::types::{ListFilesResponse, PutFileResponse};
use files_api::api::AppState;
use files_api::config::{Config, StorageBackend};
use files_api::store::LocalStore;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();
    let config = Config {
        storage_backend: StorageBackend::Local,
        s3_bucket_name: None,
        local_storage_path: dir.path().display().to_string(),
        rest_port: 0,
    };
    let app = router(AppState::new(Arc::new(store), config));
    (app, dir)
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn put_file(
    app: &Router,
    path: &str,
    content: &'static [u8],
    content_type: &str,
) -> axum::response::Response {
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/v1/files/{path}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(content))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_upload_then_update() {
    let (app, _dir) = test_app();

    let response = put_file(&app, "some/nested/file.txt", b"some content", "text/plain").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let put: PutFileResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(put.file_path, "some/nested/file.txt");
    assert_eq!(put.message, "New file uploaded at /some/nested/file.txt");

    let response = put_file(&app, "some/nested/file.txt", b"updated content", "text/plain").await;
    assert_eq!(response.status(), StatusCode::OK);
    let put: PutFileResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(put.message, "Existing file updated at /some/nested/file.txt");
}

#[tokio::test]
async fn test_upload_download_round_trip() {
    let (app, _dir) = test_app();

    put_file(&app, "test.txt", b"Hello, world!", "text/plain").await;

    let response = get(&app, "/v1/files/test.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    assert_eq!(body_bytes(response).await, b"Hello, world!");
}

#[tokio::test]
async fn test_file_metadata_headers() {
    let (app, _dir) = test_app();

    put_file(&app, "test.txt", b"Hello, world!", "text/plain").await;

    let request = Request::builder()
        .method("HEAD")
        .uri("/v1/files/test.txt")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "13");
    let last_modified = headers
        .get(header::LAST_MODIFIED)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(last_modified.ends_with("GMT"), "{last_modified}");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let (app, _dir) = test_app();

    put_file(&app, "test.txt", b"Hello, world!", "text/plain").await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/files/test.txt")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());

    let response = get(&app, "/v1/files/test.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "detail": "File not found" })
    );

    // Double delete surfaces 404, not idempotent success.
    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/files/test.txt")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_not_found_cases() {
    let (app, _dir) = test_app();

    let response = get(&app, "/v1/files/nonexistantfile.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "detail": "File not found" })
    );

    let request = Request::builder()
        .method("HEAD")
        .uri("/v1/files/nonexistantfile.txt")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/files/nonexistantfile.txt")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prefix_key_is_not_found() {
    let (app, _dir) = test_app();

    put_file(&app, "some/nested/file.txt", b"content", "text/plain").await;

    // A key that exists only as a prefix of other keys is not an object.
    let request = Request::builder()
        .method("HEAD")
        .uri("/v1/files/some")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NOT_FOUND);

    let response = get(&app, "/v1/files/some").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "detail": "File not found" })
    );

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/files/some/nested")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NOT_FOUND);

    // The real object still resolves.
    let response = get(&app, "/v1/files/some/nested/file.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_files_with_pagination() {
    let (app, _dir) = test_app();

    for i in 0..13 {
        put_file(&app, &format!("file{i:02}.txt"), b"x", "text/plain").await;
    }

    let response = get(&app, "/v1/files?page_size=10").await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: ListFilesResponse =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(listing.files.len(), 10);
    let token = listing.next_page_token.expect("more results remain");
    assert!(!token.is_empty());

    // Follow the token: page_size and directory must not be re-supplied.
    let response = get(&app, &format!("/v1/files?page_token={token}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: ListFilesResponse =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(listing.files.len(), 3);
    assert!(listing.next_page_token.is_none());
    assert_eq!(listing.files[0].file_path, "file10.txt");
}

#[tokio::test]
async fn test_list_defaults_and_null_token() {
    let (app, _dir) = test_app();

    put_file(&app, "a.txt", b"aa", "text/plain").await;
    put_file(&app, "b.txt", b"bbb", "text/plain").await;

    let response = get(&app, "/v1/files").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
    // Explicit null, never an empty string.
    assert!(body["next_page_token"].is_null());
    assert_eq!(body["files"][0]["file_path"], "a.txt");
    assert_eq!(body["files"][0]["size_bytes"], 2);
}

#[tokio::test]
async fn test_list_directory_prefix() {
    let (app, _dir) = test_app();

    for path in ["docs/a.txt", "docs/b.txt", "img/c.png"] {
        put_file(&app, path, b"x", "text/plain").await;
    }

    let response = get(&app, "/v1/files?directory=docs/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: ListFilesResponse =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    let paths: Vec<_> = listing.files.iter().map(|f| f.file_path.as_str()).collect();
    assert_eq!(paths, ["docs/a.txt", "docs/b.txt"]);
}

#[tokio::test]
async fn test_list_invalid_page_size() {
    let (app, _dir) = test_app();

    for page_size in ["-1", "0", "9", "101"] {
        let response = get(&app, &format!("/v1/files?page_size={page_size}")).await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "page_size={page_size}"
        );
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("page_size"));
    }

    // Non-integer page_size is a validation failure too.
    let response = get(&app, "/v1/files?page_size=ten").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Out-of-range page_size reports as such even alongside a token.
    let response = get(&app, "/v1/files?page_size=101&page_token=tok").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("page_size"));
}

#[tokio::test]
async fn test_list_mutually_exclusive_parameters() {
    let (app, _dir) = test_app();

    let response = get(
        &app,
        "/v1/files?page_size=10&page_token=some_token&directory=not_default",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(
        body["errors"],
        serde_json::json!([
            "Value error, 'page_token' is mutually exclusive with 'page_size' and 'directory'"
        ])
    );

    let response = get(&app, "/v1/files?directory=docs/&page_token=some_token").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_garbage_page_token_is_a_server_error() {
    let (app, _dir) = test_app();

    // Tokens are opaque and unvalidated; a broken one fails at the store
    // and surfaces as a generic 500.
    let response = get(&app, "/v1/files?page_token=%21%21not-a-token%21%21").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "detail": "Internal server error" })
    );
}

#[tokio::test]
async fn test_upload_without_content_type_defaults() {
    let (app, _dir) = test_app();

    let request = Request::builder()
        .method("PUT")
        .uri("/v1/files/raw.bin")
        .body(Body::from(&b"\x00\x01\x02"[..]))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = get(&app, "/v1/files/raw.bin").await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
}

#![cfg(feature = "ersserver")]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ersrelease::{ReleaseServerExt, ReleaseSettings, ScheduledItem};
use ersserver::Server;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn create_test_router() -> (TempDir, Router) {
    let temp_dir = tempfile::tempdir().unwrap();
    let media = temp_dir.path().join("music");
    std::fs::create_dir_all(&media).unwrap();
    std::fs::write(media.join("song.mp3"), b"ID3").unwrap();
    std::fs::write(media.join("cover.jpg"), b"jpg").unwrap();

    let settings = ReleaseSettings::new(&media, temp_dir.path().join("state"));
    let mut server = Server::new("Test", "localhost", 0);
    server.init_release_service(settings).await.unwrap();

    (temp_dir, server.router().await)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_empty_publish_is_rejected() {
    let (_temp_dir, router) = create_test_router().await;

    let (status, body) = send(&router, post_json("/api/releases/publish", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "EMPTY_REQUEST");

    let (status, _) = send(
        &router,
        post_json("/api/releases/publish", json!({"files": null, "scheduled": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_names_are_reported() {
    let (_temp_dir, router) = create_test_router().await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/releases/publish",
            json!({"files": ["ok.mp3", "../etc/passwd.mp3", 42]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_FILENAMES");
    assert_eq!(body["entries"], json!(["../etc/passwd.mp3", "42"]));

    let (_, published) = send(&router, get("/api/releases/published")).await;
    assert_eq!(published, json!([]));
}

#[tokio::test]
async fn test_invalid_schedule_is_reported() {
    let (_temp_dir, router) = create_test_router().await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/releases/publish",
            json!({"scheduled": {"file": "song.mp3", "time": "whenever"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_SCHEDULED_ITEMS");
    assert_eq!(body["entries"], json!(["song.mp3 @ whenever"]));
}

#[tokio::test]
async fn test_publish_flow() {
    let (_temp_dir, router) = create_test_router().await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/releases/publish",
            json!({
                "files": "song.mp3",
                "scheduled": [
                    {"file": "past.flac", "time": "2020-01-01T00:00:00Z"},
                    {"file": "future.wav", "time": "2999-01-01T00:00:00Z"}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], json!(["song.mp3"]));
    assert_eq!(body["scheduled"].as_array().unwrap().len(), 2);

    // La requête suivante réconcilie d'abord : past.flac est publié
    let (status, state) = send(&router, get("/api/releases/state")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["published"], json!(["song.mp3", "past.flac"]));
    assert_eq!(
        state["scheduled"],
        json!([{"file": "future.wav", "time": "2999-01-01T00:00:00.000Z"}])
    );

    let (status, body) = send(
        &router,
        post_json("/api/releases/unpublish", json!({"filesToDelete": "song.mp3"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(["song.mp3"]));
    assert_eq!(body["state"]["published"], json!(["past.flac"]));

    let (status, body) = send(
        &router,
        post_json("/api/releases/scheduled/cancel", json!({"scheduledToDelete": ["future.wav"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let removed: Vec<ScheduledItem> = serde_json::from_value(body["removed"].clone()).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(body["state"]["scheduled"], json!([]));
}

#[tokio::test]
async fn test_static_documents_and_media() {
    let (_temp_dir, router) = create_test_router().await;

    send(&router, post_json("/api/releases/publish", json!({"files": ["song.mp3"]}))).await;

    let (status, published) = send(&router, get("/published.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published, json!(["song.mp3"]));

    let (status, scheduled) = send(&router, get("/scheduled.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scheduled, json!([]));

    let response = router.clone().oneshot(get("/music/song.mp3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.clone().oneshot(get("/music/absent.mp3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_listing() {
    let (_temp_dir, router) = create_test_router().await;

    let (status, files) = send(&router, get("/api/releases/files")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(files, json!(["song.mp3"]));
}

#[tokio::test]
async fn test_manual_reconcile() {
    let (_temp_dir, router) = create_test_router().await;

    let (status, body) = send(&router, post_json("/api/releases/reconcile", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"released": []}));
}

#[tokio::test]
async fn test_storage_failure_is_reported() {
    let (temp_dir, router) = create_test_router().await;
    let published = temp_dir.path().join("state").join("published.json");
    std::fs::remove_file(&published).unwrap();
    std::fs::create_dir(&published).unwrap();

    let (status, body) = send(
        &router,
        post_json("/api/releases/publish", json!({"files": ["song.mp3"]})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "STORAGE_ERROR");
}

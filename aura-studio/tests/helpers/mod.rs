//! Test helper utilities
//!
//! Shared setup for aura-studio integration tests: a router backed by a
//! temporary database and media folder, request builders and a poller for
//! background analyses.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::util::ServiceExt;

use aura_studio::models::{FeedbackResult, Snapshot};
use aura_studio::services::{FeedbackError, FeedbackProvider, MockFeedbackProvider};

pub const BOUNDARY: &str = "aura-test-boundary";

/// Router plus the resources it owns; keep alive for the whole test
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub temp_dir: TempDir,
    pub worker: JoinHandle<()>,
}

impl TestApp {
    pub fn media_root(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("media")
    }

    /// Send a request, returning status and parsed JSON body (Null if empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).to_string()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(json_request("PUT", uri, body)).await
    }

    pub async fn send_form(&self, method: &str, uri: &str, form: MultipartBody) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(form.finish()))
                .unwrap(),
        )
        .await
    }

    /// Create a campaign and return its ID
    pub async fn create_campaign(&self, body: Value) -> String {
        let (status, json) = self.post_json("/api/campaigns", &body).await;
        assert_eq!(status, StatusCode::CREATED, "create campaign failed: {}", json);
        json["id"].as_str().unwrap().to_string()
    }

    /// Create a post with text fields only and return its JSON
    pub async fn create_post(&self, campaign_id: &str, title: &str, caption: &str) -> Value {
        let form = MultipartBody::new().text("title", title).text("caption", caption);
        let (status, json) = self
            .send_form("POST", &format!("/api/campaigns/{}/posts", campaign_id), form)
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {}", json);
        json
    }

    /// Poll an analysis until it reaches `complete` or `failed`
    pub async fn wait_for_analysis(&self, post_id: &str, analysis_id: &str) -> Value {
        let uri = format!("/api/posts/{}/analysis/{}", post_id, analysis_id);
        for _ in 0..250 {
            let (status, json) = self.get(&uri).await;
            assert_eq!(status, StatusCode::OK, "poll failed: {}", json);
            if json["status"] == "complete" || json["status"] == "failed" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("analysis {} did not finish", analysis_id);
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.bytes
    }
}

/// App backed by the deterministic mock provider
pub async fn create_test_app() -> TestApp {
    create_test_app_with(Arc::new(MockFeedbackProvider::new())).await
}

pub async fn create_test_app_with(provider: Arc<dyn FeedbackProvider>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let media_root = temp_dir.path().join("media");
    std::fs::create_dir_all(&media_root).unwrap();

    let pool = aura_studio::db::init_database_pool(&temp_dir.path().join("aura.db"))
        .await
        .expect("Failed to initialize database");

    let (state, worker) = aura_studio::AppState::start(pool.clone(), provider, media_root);
    let router = aura_studio::build_router(state);

    TestApp {
        router,
        pool,
        temp_dir,
        worker,
    }
}

/// Provider that always fails with a fixed error
pub struct FailingProvider;

#[async_trait]
impl FeedbackProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _snapshot: &Snapshot) -> Result<FeedbackResult, FeedbackError> {
        Err(FeedbackError::Api(500, "upstream exploded".to_string()))
    }
}

/// Provider returning fixed spans, recording the snapshots it saw
pub struct ScriptedProvider {
    pub result: FeedbackResult,
    pub seen: tokio::sync::Mutex<Vec<Snapshot>>,
}

impl ScriptedProvider {
    pub fn new(result: FeedbackResult) -> Self {
        Self {
            result,
            seen: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FeedbackProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, snapshot: &Snapshot) -> Result<FeedbackResult, FeedbackError> {
        self.seen.lock().await.push(snapshot.clone());
        Ok(self.result.clone())
    }
}

/// Slow provider logging call order and peak concurrency
pub struct RecordingProvider {
    pub delay: Duration,
    pub captions: tokio::sync::Mutex<Vec<String>>,
    active: std::sync::atomic::AtomicUsize,
    pub max_active: std::sync::atomic::AtomicUsize,
}

impl RecordingProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            captions: tokio::sync::Mutex::new(Vec::new()),
            active: std::sync::atomic::AtomicUsize::new(0),
            max_active: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeedbackProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, snapshot: &Snapshot) -> Result<FeedbackResult, FeedbackError> {
        use std::sync::atomic::Ordering;

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        self.captions.lock().await.push(snapshot.caption.clone());

        tokio::time::sleep(self.delay).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(FeedbackResult {
            model: "recording-1".to_string(),
            prompt_version: "1".to_string(),
            spans: Vec::new(),
        })
    }
}

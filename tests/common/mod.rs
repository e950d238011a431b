#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use tower::ServiceExt;

use roadwatch_server::api::{self, AppState};
use roadwatch_server::gemini::{AnalyzerError, MediaAnalyzer, MediaPayload, ReportSubmission};
use roadwatch_server::models::CollectionSpec;
use roadwatch_server::store::{DocumentStore, MemoryStore, StoreError};

/// Analyzer double: replays a fixed answer (or fails) and remembers what it
/// was asked.
pub struct StubAnalyzer {
    reply: Option<String>,
    pub videos: Mutex<Vec<MediaPayload>>,
    pub reports: Mutex<Vec<ReportSubmission>>,
}

impl StubAnalyzer {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            videos: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            videos: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
        })
    }

    fn answer(&self) -> Result<String, AnalyzerError> {
        self.reply.clone().ok_or(AnalyzerError::MissingContent)
    }
}

#[async_trait]
impl MediaAnalyzer for StubAnalyzer {
    async fn detect_hazards(&self, video: &MediaPayload) -> Result<String, AnalyzerError> {
        self.videos.lock().unwrap().push(video.clone());
        self.answer()
    }

    async fn analyze_report(&self, report: &ReportSubmission) -> Result<String, AnalyzerError> {
        self.reports.lock().unwrap().push(report.clone());
        self.answer()
    }
}

/// Store double for a database that never came up.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, _: &CollectionSpec, _: Map<String, Value>) -> Result<Value, StoreError> {
        Err(StoreError::NotConnected)
    }

    async fn find_all(&self, _: &CollectionSpec) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::NotConnected)
    }

    async fn find_by_id(&self, _: &CollectionSpec, _: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::NotConnected)
    }

    async fn update_by_id(
        &self,
        _: &CollectionSpec,
        _: &str,
        _: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        Err(StoreError::NotConnected)
    }

    async fn delete_by_id(&self, _: &CollectionSpec, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::NotConnected)
    }

    async fn find_recent(&self, _: &CollectionSpec, _: usize) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::NotConnected)
    }

    async fn find_from(&self, _: &CollectionSpec, _: &str, _: DateTime<Utc>) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::NotConnected)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub analyzer: Arc<StubAnalyzer>,
}

impl TestApp {
    pub fn new(analyzer: Arc<StubAnalyzer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), analyzer.clone());
        Self {
            router: api::router(state),
            store,
            analyzer,
        }
    }

    /// Routes every store call to [`FailingStore`]; `store` stays empty.
    pub fn with_failing_store(analyzer: Arc<StubAnalyzer>) -> Self {
        let state = AppState::new(Arc::new(FailingStore), analyzer.clone());
        Self {
            router: api::router(state),
            store: Arc::new(MemoryStore::new()),
            analyzer,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Method::DELETE, uri, None).await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// A well-formed id that no document has.
pub const MISSING_ID: &str = "000000000000000000000000";

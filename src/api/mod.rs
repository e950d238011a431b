pub mod analysis;
pub mod crud;
pub mod latest;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, Request, Response},
    routing::{get, post},
    Extension, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::BODY_LIMIT_BYTES;
use crate::gemini::MediaAnalyzer;
use crate::models::{HazardDetection, IncidentReport, LocalAlert};
use crate::store::DocumentStore;
pub use latest::LatestDetection;

/// Shared handles available to every handler through `Extension<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub analyzer: Arc<dyn MediaAnalyzer>,
    pub latest: Arc<LatestDetection>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, analyzer: Arc<dyn MediaAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            latest: Arc::new(LatestDetection::new()),
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Builds the application router. Metrics exposition is layered on by the
/// binary since its recorder is process-global.
pub fn router(state: AppState) -> Router {
    let report_routes = Router::new()
        .route("/", post(crud::create::<IncidentReport>).get(crud::list::<IncidentReport>))
        .route("/recent", get(crud::recent::<IncidentReport>))
        .route(
            "/:id",
            get(crud::get::<IncidentReport>)
                .put(crud::update::<IncidentReport>)
                .delete(crud::delete::<IncidentReport>),
        );

    let hazard_routes = Router::new()
        .route("/", post(crud::create::<HazardDetection>).get(crud::list::<HazardDetection>))
        .route("/recent", get(crud::recent::<HazardDetection>))
        .route(
            "/:id",
            get(crud::get::<HazardDetection>)
                .put(crud::update::<HazardDetection>)
                .delete(crud::delete::<HazardDetection>),
        );

    let alert_routes = Router::new()
        .route("/", post(crud::create::<LocalAlert>).get(crud::list::<LocalAlert>))
        .route("/recent", get(crud::recent::<LocalAlert>))
        .route("/active", get(crud::active_alerts))
        .route(
            "/:id",
            get(crud::get::<LocalAlert>)
                .put(crud::update::<LocalAlert>)
                .delete(crud::delete::<LocalAlert>),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/mongo/report-analyzer", report_routes)
        .nest("/mongo/hazard-detection", hazard_routes)
        .nest("/local-alerts", alert_routes)
        .route("/api/detect", post(analysis::detect))
        .route("/api/detect/latest", get(analysis::latest_detection))
        .route("/api/report", post(analysis::report))
        .layer(Extension(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str().to_owned())
                        .unwrap_or_else(|| request.uri().path().to_owned());

                    tracing::info_span!(
                        "request",
                        "otel.name" = format!("{} {}", request.method(), matched_path),
                        method = ?request.method(),
                        uri = ?request.uri(),
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(|response: &Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", tracing::field::display(response.status()));
                    span.record("latency", tracing::field::debug(latency));
                    tracing::info!("request completed");
                }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::gemini::{schema, AnalyzerError, MediaPayload, ReportSubmission, DEFAULT_IMAGE_MIME, DEFAULT_VIDEO_MIME};
use crate::metrics;
use crate::models::{HazardDetection, IncidentReport};
use crate::store::{Documents, StoreError};

/// Failure of an AI-backed endpoint.
///
/// Clients of these endpoints look for the literal body `Error`, so that body
/// is kept; the status code carries the failure class.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AnalysisError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalysisError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Analyzer(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        (self.status(), "Error").into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub video: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub image: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
}

fn accept<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AnalysisError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AnalysisError::BadRequest(rejection.body_text()))
}

fn log_failure(endpoint: &'static str, err: &AnalysisError) {
    error!(endpoint, error = %err, "analysis failed");
    metrics::increment_analysis_failures(endpoint);
}

// POST /api/detect
pub async fn detect(
    Extension(state): Extension<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<HazardDetection>, AnalysisError> {
    info!("/api/detect initialized");
    run_detect(&state, payload).await.map(Json).map_err(|e| {
        log_failure("detect", &e);
        e
    })
}

async fn run_detect(
    state: &AppState,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<HazardDetection, AnalysisError> {
    let request = accept(payload)?;
    let video = MediaPayload::from_base64(&request.video, DEFAULT_VIDEO_MIME);

    let raw = state.analyzer.detect_hazards(&video).await?;
    let detection = schema::parse_hazard_response(&raw)?;

    state.latest.record(detection.clone());
    metrics::increment_detections(detection.status);

    // Safe footage only updates the latest slot.
    if !detection.is_safe() {
        let saved = Documents::<HazardDetection>::new(state.store.as_ref())
            .create(&detection)
            .await?;
        info!(id = %saved.id, "hazard detection saved");
    }

    Ok(detection)
}

// GET /api/detect/latest
pub async fn latest_detection(Extension(state): Extension<AppState>) -> Response {
    match state.latest.get() {
        Some(entry) => (StatusCode::OK, Json(entry)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "No detection yet" }))).into_response(),
    }
}

// POST /api/report
pub async fn report(
    Extension(state): Extension<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<IncidentReport>, AnalysisError> {
    info!("/api/report initialized");
    run_report(&state, payload).await.map(Json).map_err(|e| {
        log_failure("report", &e);
        e
    })
}

async fn run_report(
    state: &AppState,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<IncidentReport, AnalysisError> {
    let request = accept(payload)?;
    let submission = ReportSubmission {
        image: MediaPayload::from_base64(&request.image, DEFAULT_IMAGE_MIME),
        title: request.title,
        description: request.description,
        phone: request.phone,
        location: request.location,
    };

    let raw = state.analyzer.analyze_report(&submission).await?;
    let mut report = schema::parse_report_response(&raw)?;
    fill_missing(&mut report.title, submission.title);
    fill_missing(&mut report.description, submission.description);
    fill_missing(&mut report.phone, submission.phone);
    fill_missing(&mut report.location, submission.location);

    let saved = Documents::<IncidentReport>::new(state.store.as_ref())
        .create(&report)
        .await?;
    info!(id = %saved.id, "incident report saved");
    metrics::increment_reports();

    Ok(report)
}

fn fill_missing(field: &mut Option<String>, submitted: String) {
    let blank = field.as_deref().map_or(true, |v| v.trim().is_empty());
    if blank && !submitted.trim().is_empty() {
        *field = Some(submitted);
    }
}

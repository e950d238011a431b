//! Handlers shared by the three document collections. Each is generic over the
//! model and mounted once per collection in [`super::router`].

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::info;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LocalAlert, Resource, Stored};
use crate::store::{strip_reserved, Documents};

fn body_fields(payload: Result<Json<Value>, JsonRejection>) -> AppResult<Map<String, Value>> {
    match payload {
        Ok(Json(Value::Object(mut fields))) => {
            strip_reserved(&mut fields);
            Ok(fields)
        }
        Ok(Json(_)) => Err(AppError::Validation("request body must be a JSON object".to_string())),
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    }
}

fn validate<R: Resource>(fields: Map<String, Value>) -> AppResult<R> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| AppError::Validation(e.to_string()))
}

// POST /<collection>
pub async fn create<R: Resource>(
    Extension(state): Extension<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Stored<R>>)> {
    let document: R = validate(body_fields(payload)?)?;
    let saved = Documents::<R>::new(state.store.as_ref()).create(&document).await?;
    info!(collection = R::COLLECTION.name, id = %saved.id, "document created");
    Ok((StatusCode::CREATED, Json(saved)))
}

// GET /<collection>
pub async fn list<R: Resource>(Extension(state): Extension<AppState>) -> AppResult<Json<Vec<Stored<R>>>> {
    Ok(Json(Documents::<R>::new(state.store.as_ref()).list().await?))
}

// GET /<collection>/recent
pub async fn recent<R: Resource>(Extension(state): Extension<AppState>) -> AppResult<Json<Vec<Stored<R>>>> {
    Ok(Json(Documents::<R>::new(state.store.as_ref()).recent().await?))
}

// GET /<collection>/:id
pub async fn get<R: Resource>(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Stored<R>>> {
    Documents::<R>::new(state.store.as_ref())
        .get(&id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(R::NOT_FOUND))
}

// PUT /<collection>/:id
//
// Partial update: the body is merged over the stored document and the result
// must still validate.
pub async fn update<R: Resource>(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Stored<R>>> {
    let patch = body_fields(payload)?;
    let documents = Documents::<R>::new(state.store.as_ref());

    let existing = documents.get(&id).await?.ok_or(AppError::NotFound(R::NOT_FOUND))?;
    let mut merged = match serde_json::to_value(&existing.document) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    merged.extend(patch);

    let document: R = validate(merged)?;
    let updated = documents
        .replace(&id, &document)
        .await?
        .ok_or(AppError::NotFound(R::NOT_FOUND))?;
    info!(collection = R::COLLECTION.name, id = %updated.id, "document updated");
    Ok(Json(updated))
}

// DELETE /<collection>/:id
pub async fn delete<R: Resource>(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    if !Documents::<R>::new(state.store.as_ref()).delete(&id).await? {
        return Err(AppError::NotFound(R::NOT_FOUND));
    }
    info!(collection = R::COLLECTION.name, id = %id, "document deleted");
    Ok(Json(json!({ "message": R::DELETED })))
}

// GET /local-alerts/active
pub async fn active_alerts(Extension(state): Extension<AppState>) -> AppResult<Json<Vec<Stored<LocalAlert>>>> {
    let alerts = Documents::<LocalAlert>::new(state.store.as_ref())
        .from_date(LocalAlert::DATE_FIELD, Utc::now())
        .await?;
    Ok(Json(alerts))
}

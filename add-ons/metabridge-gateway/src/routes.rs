//! HTTP routes of one platform and its exchange endpoints.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metabridge_core::{
    build_package, read_payload, Entity, EntityStore, ExchangeError, ImportRequest, PayloadRole,
    ReceiveReport,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::{AppState, ORIGIN_HEADER};

type ApiResult<T> = Result<T, ApiError>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/data", get(data))
        .route("/data/filter", get(filter_by_type))
        .route("/data/ontology", get(filter_by_ontology))
        .route("/data/types", get(ontology_types))
        .route("/data/import", post(import))
        .route("/data/export", post(export))
        .route("/data/reset", get(reset))
        .route("/receive", post(receive))
        .route("/platforms", get(platforms))
        .route("/package/read", post(read_package))
}

#[derive(Debug, Default, Deserialize)]
pub struct DataQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ontology: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub peer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiveQuery {
    pub from: Option<String>,
}

/// A present, non-blank query parameter.
fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ExchangeError::MissingParameter(name.to_string()).into()),
    }
}

fn archive(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ro-crate.zip\"",
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn health() -> &'static str {
    "OK"
}

/// Entities picked by `select`, each annotated with its ontology context.
async fn contextualized(
    state: &AppState,
    select: impl for<'a> FnOnce(&'a EntityStore) -> Vec<&'a Entity>,
) -> Vec<Value> {
    state
        .platform
        .read(|s| {
            select(&s.store)
                .into_iter()
                .map(|e| s.contextualize(e))
                .collect()
        })
        .await
}

async fn entities_of_type(state: &AppState, kind: &str) -> Json<Vec<Value>> {
    Json(contextualized(state, |store| store.filter_by_type(kind)).await)
}

async fn ontology_archive(state: &AppState, ontology: &str) -> ApiResult<Response> {
    let entities = contextualized(state, |store| store.filter_by_ontology(ontology)).await;
    Ok(archive(build_package(PayloadRole::Response, &entities)?))
}

async fn data(State(state): State<AppState>, Query(q): Query<DataQuery>) -> ApiResult<Response> {
    if q.ontology.is_some() {
        let ontology = required(q.ontology, "ontology")?;
        return ontology_archive(&state, &ontology).await;
    }
    if q.kind.is_some() {
        let kind = required(q.kind, "type")?;
        return Ok(entities_of_type(&state, &kind).await.into_response());
    }
    Ok(Json(contextualized(&state, |store| store.all().iter().collect()).await).into_response())
}

async fn filter_by_type(
    State(state): State<AppState>,
    Query(q): Query<DataQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let kind = required(q.kind, "type")?;
    Ok(entities_of_type(&state, &kind).await)
}

async fn filter_by_ontology(
    State(state): State<AppState>,
    Query(q): Query<DataQuery>,
) -> ApiResult<Response> {
    let ontology = required(q.kind, "type")?;
    ontology_archive(&state, &ontology).await
}

async fn ontology_types(State(state): State<AppState>) -> ApiResult<Response> {
    let ontologies = state.platform.read(|s| s.registry.ontologies()).await;
    Ok(archive(build_package(PayloadRole::Response, &ontologies)?))
}

async fn import(
    State(state): State<AppState>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> ApiResult<Json<Entity>> {
    let Json(request) = body?;
    Ok(Json(state.platform.import(request).await?))
}

/// Body is either `{"id": "..."}` or the bare id as a JSON string.
fn export_id(body: &Value) -> Option<&str> {
    let id = match body {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map.get("id").and_then(Value::as_str),
        _ => None,
    };
    id.filter(|id| !id.trim().is_empty())
}

async fn export(
    State(state): State<AppState>,
    Query(q): Query<ExportQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let peer = required(q.peer, "peer")?;
    let Json(body) = body?;
    let id = export_id(&body).ok_or_else(|| ExchangeError::MissingParameter("id".into()))?;
    let ack = state
        .platform
        .export_to(id, &peer, state.transport.as_ref())
        .await?;
    Ok(Json(ack))
}

async fn receive(
    State(state): State<AppState>,
    Query(q): Query<ReceiveQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ReceiveReport>> {
    let origin = headers
        .get(ORIGIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(q.from)
        .unwrap_or_default();
    Ok(Json(state.platform.receive_package(&body, &origin).await?))
}

async fn reset(State(state): State<AppState>) -> Json<Value> {
    state.platform.reset().await;
    Json(json!({ "message": format!("{} data reset", state.platform.id()) }))
}

async fn platforms(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    Json(state.config.peers.clone())
}

async fn read_package(body: Bytes) -> ApiResult<Json<Value>> {
    let content: Value = read_payload(&body, PayloadRole::Response)?;
    info!(bytes = body.len(), "read response package");
    Ok(Json(content))
}

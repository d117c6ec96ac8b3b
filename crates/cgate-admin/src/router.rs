//! A minimal CRUD surface for seeding and inspecting the Credential Store:
//! connections and combos only, gated by an `x-admin-key` header check
//! narrowed to a single header (no bearer/query-param fallbacks, since this
//! surface is for tests and local runs, not a browser-facing console).

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use cgate_provider_core::{Combo, Connection, ConnectionFilter, ConnectionId, ConnectionPatch, CredentialStore};
use cgate_storage::{ComboStore, Store};
use serde::Deserialize;

#[derive(Clone)]
pub struct AdminState {
    store: Arc<Store>,
    admin_key_hash: String,
}

pub fn router(store: Arc<Store>, admin_key_hash: String) -> Router {
    let state = AdminState { store, admin_key_hash };

    Router::new()
        .route("/connections", get(list_connections).post(create_connection))
        .route("/connections/{id}", axum::routing::patch(patch_connection))
        .route("/combos", get(list_combos).post(create_combo))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}

async fn admin_auth(
    State(state): State<AdminState>,
    headers: HeaderMap,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let key = headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if cgate_core::hash_admin_key(key) != state.admin_key_hash {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

async fn list_connections(State(state): State<AdminState>) -> impl IntoResponse {
    match state.store.get_connections(ConnectionFilter::default()).await {
        Ok(connections) => Json(serde_json::json!({ "connections": connections })).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn create_connection(
    State(state): State<AdminState>,
    Json(connection): Json<Connection>,
) -> impl IntoResponse {
    match state.store.create_connection(connection).await {
        Ok(connection) => (StatusCode::CREATED, Json(connection)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Default, Deserialize)]
struct ConnectionPatchPayload {
    is_active: Option<bool>,
}

async fn patch_connection(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<ConnectionPatchPayload>,
) -> impl IntoResponse {
    let patch = ConnectionPatch { is_active: payload.is_active, ..Default::default() };
    match state.store.update_connection(ConnectionId(id), patch).await {
        Ok(connection) => Json(connection).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn list_combos(State(state): State<AdminState>) -> impl IntoResponse {
    match state.store.list_combos().await {
        Ok(combos) => Json(serde_json::json!({ "combos": combos })).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn create_combo(State(state): State<AdminState>, Json(combo): Json<Combo>) -> impl IntoResponse {
    match state.store.upsert_combo(combo).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(err) => storage_error_response(err),
    }
}

fn storage_error_response(err: cgate_provider_core::StorageError) -> Response {
    let status = match err {
        cgate_provider_core::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        cgate_provider_core::StorageError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

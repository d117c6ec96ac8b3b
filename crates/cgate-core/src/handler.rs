use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cgate_protocol::chat::CreateChatCompletionRequestBody;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assemble::{aggregate_response, streaming_response};
use crate::auth::AuthError;
use crate::core::CoreState;
use crate::dispatch::handle_chat;
use crate::error::ApiError;

pub async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

pub async fn chat_handler(State(state): State<Arc<CoreState>>, headers: HeaderMap, body: Bytes) -> Response {
    let trace_id = Uuid::new_v4().to_string();

    if let Err(err) = state.auth.authenticate(&headers) {
        warn!(event = "chat_unauthenticated", trace_id = %trace_id, status = %err.status.as_u16());
        return with_request_id(auth_error_response(err), &trace_id);
    }

    let request_byte_len = body.len();
    let request: CreateChatCompletionRequestBody = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(event = "chat_malformed_body", trace_id = %trace_id, error = %err);
            return with_request_id(
                ApiError::input_error(format!("malformed request body: {err}")).into_response(),
                &trace_id,
            );
        }
    };

    let is_stream = request.is_streaming();
    let model = request.model.clone();
    let started_at = Instant::now();
    info!(event = "chat_received", trace_id = %trace_id, model = %model, is_stream);

    let result = handle_chat(
        state.store.as_ref(),
        state.arbiter.as_ref(),
        state.registry.as_ref(),
        state.provider_configs.as_ref(),
        request,
    )
    .await;

    match result {
        Ok(success) => {
            info!(
                event = "chat_dispatched",
                trace_id = %trace_id,
                model = %model,
                connection_id = success.connection.id.0,
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream
            );
            let response = if is_stream {
                streaming_response(model, request_byte_len, success.events)
            } else {
                aggregate_response(model, request_byte_len, success.events).await
            };
            with_request_id(response, &trace_id)
        }
        Err(err) => {
            warn!(
                event = "chat_failed",
                trace_id = %trace_id,
                model = %model,
                status = %err.status.as_u16(),
                message = %err.message,
                elapsed_ms = started_at.elapsed().as_millis()
            );
            with_request_id(err.into_response(), &trace_id)
        }
    }
}

fn with_request_id(mut response: Response, trace_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        response.headers_mut().insert("x-cgate-request-id", value);
    }
    response
}

fn auth_error_response(err: AuthError) -> Response {
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp.headers_mut().extend(err.headers);
    resp
}

//! The Normalised Response Assembler: turns a provider executor's
//! [`EventStream`] into either an OpenAI-shaped SSE stream or one aggregated
//! `chat.completion` object, regardless of which provider actually
//! answered. Streaming construction follows a spawn-task-then-`ReceiverStream`
//! idiom; the SSE framing itself reuses `cgate_protocol::sse::encode_sse`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cgate_protocol::chat::{
 ChatCompletionChoice, ChatCompletionChunkObjectType, ChatCompletionFinishReason,
 ChatCompletionMessageToolCall, ChatCompletionMessageToolCallChunk,
 ChatCompletionMessageToolCallChunkFunction, ChatCompletionMessageToolCallFunction,
 ChatCompletionObjectType, ChatCompletionResponseMessage, ChatCompletionResponseRole,
 ChatCompletionRole, ChatCompletionStreamChoice, ChatCompletionStreamResponseDelta,
 ChatCompletionToolCallChunkType, CompletionUsage, CreateChatCompletionResponse,
 CreateChatCompletionStreamResponse,
};
use cgate_protocol::sse::encode_sse;
use cgate_provider_core::{EventStream, StreamEvent};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// `max(1, floor(chars / 4))`, a rough token-estimation heuristic used
/// since none of the wrapped providers return authoritative
/// usage for every response shape this gateway can produce.
fn estimate_tokens(chars: usize) -> i64 {
 ((chars / 4) as i64).max(1)
}

/// Prompt tokens estimated off the raw request body length; falls back to a
/// small constant for an empty/absent body rather than reporting zero.
fn estimate_prompt_tokens(body_byte_len: usize) -> i64 {
 if body_byte_len == 0 { 8 } else { estimate_tokens(body_byte_len) }
}

fn now_unix_seconds() -> i64 {
 SystemTime::now()
 .duration_since(UNIX_EPOCH)
 .map(|d| d.as_secs() as i64)
 .unwrap_or(0)
}

/// Assigns each tool-call id a stable index the first time it's seen, so
/// streamed tool-call deltas stay addressable by index across chunks.
#[derive(Default)]
struct ToolCallIndex {
 next: i64,
 by_id: HashMap<String, i64>,
}

impl ToolCallIndex {
 fn index_for(&mut self, id: &str) -> i64 {
 if let Some(&index) = self.by_id.get(id) {
 return index;
 }
 let index = self.next;
 self.next += 1;
 self.by_id.insert(id.to_string(), index);
 index
 }
}

async fn send_chunk(
 tx: &tokio::sync::mpsc::Sender<Result<Bytes, Infallible>>,
 id: &str,
 created: i64,
 model: &str,
 delta: ChatCompletionStreamResponseDelta,
 finish_reason: Option<ChatCompletionFinishReason>,
 usage: Option<CompletionUsage>,
) -> bool {
 let chunk = CreateChatCompletionStreamResponse {
 id: id.to_string(),
 object: ChatCompletionChunkObjectType::ChatCompletionChunk,
 created,
 model: model.to_string(),
 choices: vec![ChatCompletionStreamChoice { index: 0, delta, finish_reason }],
 usage,
 };
 let Ok(json) = serde_json::to_string(&chunk) else {
 return false;
 };
 tx.send(Ok(encode_sse(None, &json))).await.is_ok()
}

/// Builds the SSE response for a streaming chat completion. Spawns a task
/// that drains `events` and forwards OpenAI-shaped chunks over a bounded
/// channel; the response body streams directly off that channel.
pub fn streaming_response(model: String, request_byte_len: usize, mut events: EventStream) -> Response {
 let id = format!("chatcmpl-{}", Uuid::new_v4());
 let created = now_unix_seconds();
 let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, Infallible>>(32);

 tokio::spawn(async move {
 let mut first_delta = true;
 let mut output_chars = 0usize;
 let mut tool_index = ToolCallIndex::default();
 let mut finish_reason = ChatCompletionFinishReason::Stop;

 while let Some(event) = events.recv().await {
 let sent = match event {
 StreamEvent::Text(text) => {
 output_chars += text.chars().count();
 let delta = ChatCompletionStreamResponseDelta {
 role: first_delta.then_some(ChatCompletionRole::Assistant),
 content: Some(text),
 tool_calls: None,
 };
 first_delta = false;
 send_chunk(&tx, &id, created, &model, delta, None, None).await
 }
 StreamEvent::ToolCallDelta { id: call_id, name, arguments_fragment, .. } => {
 output_chars += arguments_fragment.chars().count();
 let index = tool_index.index_for(&call_id);
 let chunk_call = ChatCompletionMessageToolCallChunk {
 index,
 id: name.is_some().then(|| call_id.clone()),
 r#type: name.is_some().then_some(ChatCompletionToolCallChunkType::Function),
 function: Some(ChatCompletionMessageToolCallChunkFunction {
 name,
 arguments: Some(arguments_fragment),
 }),
 };
 let delta = ChatCompletionStreamResponseDelta {
 role: first_delta.then_some(ChatCompletionRole::Assistant),
 content: first_delta.then(String::new),
 tool_calls: Some(vec![chunk_call]),
 };
 first_delta = false;
 finish_reason = ChatCompletionFinishReason::ToolCalls;
 send_chunk(&tx, &id, created, &model, delta, None, None).await
 }
 StreamEvent::Error { message, is_rate_limit } => {
 tracing::warn!(event = "stream_error", message = %message, is_rate_limit);
 break;
 }
 };
 if !sent {
 return;
 }
 }

 let prompt_tokens = estimate_prompt_tokens(request_byte_len);
 let completion_tokens = estimate_tokens(output_chars);
 let usage = CompletionUsage {
 prompt_tokens,
 completion_tokens,
 total_tokens: prompt_tokens + completion_tokens,
 };
 let final_delta = ChatCompletionStreamResponseDelta { role: None, content: None, tool_calls: None };
 if send_chunk(&tx, &id, created, &model, final_delta, Some(finish_reason), Some(usage)).await {
 let _ = tx.send(Ok(cgate_protocol::sse::encode_done())).await;
 }
 });

 let mut resp = Response::new(Body::from_stream(ReceiverStream::new(rx)));
 *resp.status_mut() = StatusCode::OK;
 resp.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
 resp
}

/// Builds the aggregated `chat.completion` response for a non-streaming
/// request, draining the whole `events` stream before responding.
pub async fn aggregate_response(model: String, request_byte_len: usize, mut events: EventStream) -> Response {
 let mut content = String::new();
 let mut tool_order: Vec<String> = Vec::new();
 let mut tool_names: HashMap<String, Option<String>> = HashMap::new();
 let mut tool_args: HashMap<String, String> = HashMap::new();

 while let Some(event) = events.recv().await {
 match event {
 StreamEvent::Text(text) => content.push_str(&text),
 StreamEvent::ToolCallDelta { id, name, arguments_fragment, .. } => {
 if !tool_args.contains_key(&id) {
 tool_order.push(id.clone());
 }
 tool_names.entry(id.clone()).or_insert(name);
 tool_args.entry(id).or_default().push_str(&arguments_fragment);
 }
 StreamEvent::Error { message, is_rate_limit } => {
 tracing::warn!(event = "aggregate_stream_error", message = %message, is_rate_limit);
 break;
 }
 }
 }

 let saw_tool_call = !tool_order.is_empty();
 let tool_calls = saw_tool_call.then(|| {
 tool_order
 .into_iter()
 .map(|id| {
 let name = tool_names.remove(&id).flatten().unwrap_or_default();
 let arguments = tool_args.remove(&id).unwrap_or_default();
 ChatCompletionMessageToolCall::Function {
 id,
 function: ChatCompletionMessageToolCallFunction { name, arguments },
 }
 })
 .collect()
 });

 let finish_reason = if saw_tool_call {
 ChatCompletionFinishReason::ToolCalls
 } else {
 ChatCompletionFinishReason::Stop
 };
 let prompt_tokens = estimate_prompt_tokens(request_byte_len);
 let completion_tokens = estimate_tokens(content.chars().count());
 let usage = CompletionUsage {
 prompt_tokens,
 completion_tokens,
 total_tokens: prompt_tokens + completion_tokens,
 };

 let message = ChatCompletionResponseMessage {
 role: ChatCompletionResponseRole::Assistant,
 content: (!content.is_empty()).then_some(content),
 tool_calls,
 };

 let body = CreateChatCompletionResponse {
 id: format!("chatcmpl-{}", Uuid::new_v4()),
 object: ChatCompletionObjectType::ChatCompletion,
 created: now_unix_seconds(),
 model,
 choices: vec![ChatCompletionChoice { index: 0, message, finish_reason }],
 usage: Some(usage),
 };

 axum::Json(body).into_response()
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn estimate_tokens_floors_but_never_reports_zero() {
 assert_eq!(estimate_tokens(0), 1);
 assert_eq!(estimate_tokens(3), 1);
 assert_eq!(estimate_tokens(4), 1);
 assert_eq!(estimate_tokens(8), 2);
 }

 #[test]
 fn empty_prompt_uses_small_constant() {
 assert_eq!(estimate_prompt_tokens(0), 8);
 assert_eq!(estimate_prompt_tokens(40), 10);
 }

 #[test]
 fn tool_call_index_is_stable_per_id() {
 let mut index = ToolCallIndex::default();
 assert_eq!(index.index_for("a"), 0);
 assert_eq!(index.index_for("b"), 1);
 assert_eq!(index.index_for("a"), 0);
 }
}

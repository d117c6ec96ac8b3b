//! The uniform HTTP executor backing every provider except Cursor. Per its
//! own non-goals, only Cursor's binary protocol gets a full codec; every
//! other provider here is treated as an HTTP/JSON endpoint that accepts the
//! same OpenAI-shaped chat-completion body this gateway's ingress takes,
//! with a provider-specific authorization header (see `auth`). Grounded on
//! the `providers/custom/mod.rs` generic HTTP provider (URL
//! joining, header helpers) narrowed down since it no longer needs to
//! translate between differing native request/response shapes.

pub mod auth;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use cgate_protocol::chat::{
 ChatCompletionResponseMessage, CreateChatCompletionRequestBody, CreateChatCompletionResponse,
 CreateChatCompletionStreamResponse, STREAM_DONE_MARKER,
};
use cgate_protocol::sse::SseParser;
use cgate_provider_core::{
 header_set, Connection, Executor, ExecutorFailure, ExecutorRequest, EventStream, Headers,
 Provider, ProviderConfig, ProviderError, ProviderResult, RefreshedTokens, StreamEvent,
 TokenRefresher,
};

use crate::client::shared_client;

pub struct UniformHttpExecutor {
 provider: Provider,
 refresher: Option<Arc<dyn TokenRefresher>>,
}

impl UniformHttpExecutor {
 pub fn new(provider: Provider, refresher: Option<Arc<dyn TokenRefresher>>) -> Self {
 Self { provider, refresher }
 }
}

#[async_trait]
impl Executor for UniformHttpExecutor {
 fn provider(&self) -> Provider {
 self.provider
 }

 fn build_url(
 &self,
 config: &ProviderConfig,
 _model: &str,
 _stream: bool,
 url_index: usize,
 ) -> ProviderResult<String> {
 let base = config
 .base_urls
 .get(url_index)
 .ok_or_else(|| ProviderError::InvalidConfig("no base URL at that index".to_string()))?;
 Ok(format!("{}{}", base.trim_end_matches('/'), config.chat_path))
 }

 fn build_headers(
 &self,
 config: &ProviderConfig,
 connection: &Connection,
 _stream: bool,
 ) -> ProviderResult<Headers> {
 let mut headers = Headers::new();
 for (name, value) in &config.default_headers {
 header_set(&mut headers, name, value.clone());
 }
 header_set(&mut headers, "content-type", "application/json");
 auth::apply(self.provider, &mut headers, connection)?;
 Ok(headers)
 }

 fn transform_request(
 &self,
 model: &str,
 body: &CreateChatCompletionRequestBody,
 stream: bool,
 _connection: &Connection,
 ) -> ProviderResult<Bytes> {
 let mut body = body.clone();
 body.model = model.to_string();
 body.stream = Some(stream);
 serde_json::to_vec(&body)
 .map(Bytes::from)
 .map_err(|err| ProviderError::Other(err.to_string()))
 }

 async fn execute(&self, request: ExecutorRequest<'_>) -> Result<EventStream, ExecutorFailure> {
 let headers = self
 .build_headers(request.config, request.connection, request.stream)
 .map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;
 let body = self
 .transform_request(&request.model, request.body, request.stream, request.connection)
 .map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;
 let stream = request.stream;

 cgate_provider_core::execute_with_base_url_fallback(&request.config.base_urls, |_url, index| {
 let headers = headers.clone();
 let body = body.clone();
 let url = self.build_url(request.config, &request.model, stream, index);
 async move {
 let url = url.map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;
 send_json_request(&url, headers, body, stream).await
 }
 })
 .await
 }

 async fn refresh_credentials(&self, connection: &Connection) -> Option<RefreshedTokens> {
 self.refresher.as_ref()?.refresh(connection).await
 }
}

async fn send_json_request(
 url: &str,
 headers: Headers,
 body: Bytes,
 stream: bool,
) -> Result<EventStream, ExecutorFailure> {
 let mut req = shared_client().post(url).body(body);
 for (name, value) in &headers {
 req = req.header(name.as_str(), value.as_str());
 }
 let response = req
 .send()
 .await
 .map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;

 let status = response.status().as_u16();
 if status != 200 {
 let body_text = response.text().await.unwrap_or_else(|_| "upstream error".to_string());
 return Err(ExecutorFailure::Http { status, headers: Headers::new(), body_text });
 }

 let (tx, rx) = tokio::sync::mpsc::channel(32);
 if stream {
 tokio::spawn(async move {
 let mut parser = SseParser::new();
 let mut body_stream = response.bytes_stream();
 while let Some(chunk) = body_stream.next().await {
 let Ok(chunk) = chunk else { break };
 for event in parser.push_bytes(&chunk) {
 if !forward_sse_event(&event.data, &tx).await {
 return;
 }
 }
 }
 for event in parser.finish() {
 if !forward_sse_event(&event.data, &tx).await {
 return;
 }
 }
 });
 } else {
 tokio::spawn(async move {
 let Ok(body) = response.bytes().await else { return };
 for event in events_from_response_json(&body) {
 if tx.send(event).await.is_err() {
 return;
 }
 }
 });
 }
 Ok(rx)
}

/// Returns `false` once the `[DONE]` marker is seen, signalling the caller
/// to stop reading further chunks.
async fn forward_sse_event(data: &str, tx: &tokio::sync::mpsc::Sender<StreamEvent>) -> bool {
 if data == STREAM_DONE_MARKER {
 return false;
 }
 let Ok(chunk) = serde_json::from_str::<CreateChatCompletionStreamResponse>(data) else {
 return true;
 };
 for choice in &chunk.choices {
 if let Some(content) = &choice.delta.content {
 if tx.send(StreamEvent::Text(content.clone())).await.is_err() {
 return false;
 }
 }
 if let Some(tool_calls) = &choice.delta.tool_calls {
 for call in tool_calls {
 let id = call.id.clone().unwrap_or_default();
 let name = call.function.as_ref().and_then(|f| f.name.clone());
 let arguments_fragment =
 call.function.as_ref().and_then(|f| f.arguments.clone()).unwrap_or_default();
 let event = StreamEvent::ToolCallDelta { id, name, arguments_fragment, is_last: false };
 if tx.send(event).await.is_err() {
 return false;
 }
 }
 }
 }
 true
}

fn events_from_response_json(body: &[u8]) -> Vec<StreamEvent> {
 let Ok(response) = serde_json::from_slice::<CreateChatCompletionResponse>(body) else {
 return vec![StreamEvent::Error {
 message: "malformed upstream response".to_string(),
 is_rate_limit: false,
 }];
 };
 let mut events = Vec::new();
 for choice in response.choices {
 events_from_message(choice.message, &mut events);
 }
 events
}

fn events_from_message(message: ChatCompletionResponseMessage, events: &mut Vec<StreamEvent>) {
 if let Some(content) = message.content {
 events.push(StreamEvent::Text(content));
 }
 if let Some(tool_calls) = message.tool_calls {
 for call in tool_calls {
 let cgate_protocol::chat::ChatCompletionMessageToolCall::Function { id, function } = call;
 events.push(StreamEvent::ToolCallDelta {
 id,
 name: Some(function.name),
 arguments_fragment: function.arguments,
 is_last: true,
 });
 }
 }
}

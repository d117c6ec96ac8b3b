//! The Provider Executor contract (C6): build the upstream request, invoke
//! it, and hand back a stream of normalised events. Grounded on the same
//! build/execute method split used by a provider trait shaped around those
//! two steps, narrowed to the method set named here (no ingress
//! dispatch-table machinery, which doesn't apply here since this gateway
//! only accepts OpenAI-shaped ingress).

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;

use cgate_protocol::chat::CreateChatCompletionRequestBody;

use crate::headers::Headers;
use crate::model::{Connection, Provider, ProviderConfig, StreamEvent};
use crate::refresh::RefreshedTokens;

pub type EventStream = tokio::sync::mpsc::Receiver<StreamEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
 Get,
 Post,
}

impl HttpMethod {
 pub fn as_str(&self) -> &'static str {
 match self {
 HttpMethod::Get => "GET",
 HttpMethod::Post => "POST",
 }
 }
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
 pub method: HttpMethod,
 pub url: String,
 pub headers: Headers,
 pub body: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub enum ExecutorFailure {
 /// An HTTP response came back, but wasn't a usable 2xx.
 Http {
 status: u16,
 headers: Headers,
 body_text: String,
 },
 /// No HTTP response was obtained at all (connect/timeout/TLS/DNS).
 Transport { message: String },
}

impl ExecutorFailure {
 pub fn status(&self) -> u16 {
 match self {
 ExecutorFailure::Http { status, .. } => *status,
 // Transport failures have no status; the Dispatch Loop treats
 // them like a 5xx for classification purposes.
 ExecutorFailure::Transport { .. } => 599,
 }
 }

 pub fn body_text(&self) -> &str {
 match self {
 ExecutorFailure::Http { body_text, .. } => body_text,
 ExecutorFailure::Transport { message } => message,
 }
 }
}

pub struct ExecutorRequest<'a> {
 pub model: String,
 pub body: &'a CreateChatCompletionRequestBody,
 pub stream: bool,
 pub connection: &'a Connection,
 pub config: &'a ProviderConfig,
}

#[async_trait]
pub trait Executor: Send + Sync {
 fn provider(&self) -> Provider;

 fn build_url(
 &self,
 config: &ProviderConfig,
 model: &str,
 stream: bool,
 url_index: usize,
 ) -> crate::errors::ProviderResult<String>;

 fn build_headers(
 &self,
 config: &ProviderConfig,
 connection: &Connection,
 stream: bool,
 ) -> crate::errors::ProviderResult<Headers>;

 fn transform_request(
 &self,
 model: &str,
 body: &CreateChatCompletionRequestBody,
 stream: bool,
 connection: &Connection,
 ) -> crate::errors::ProviderResult<Bytes>;

 async fn execute(&self, request: ExecutorRequest<'_>) -> Result<EventStream, ExecutorFailure>;

 /// Most providers delegate to a [`crate::refresh::TokenRefresher`];
 /// Cursor (and any provider with non-expiring imported tokens) just
 /// returns `None`.
 async fn refresh_credentials(&self, connection: &Connection) -> Option<RefreshedTokens> {
 let _ = connection;
 None
 }
}

/// A status worth advancing to the next base URL for,
/// ("if the current URL returns a retryable status (currently 429) AND
/// more fallback URLs remain, advance").
const RETRYABLE_STATUS: u16 = 429;

/// Shared base-URL fallback loop used by the plain HTTP/JSON provider
/// executors (everything except Cursor, which overrides `execute`
/// entirely to drive the ConnectRPC codec over HTTP/2).
pub async fn execute_with_base_url_fallback<F, Fut>(
 base_urls: &[String],
 mut attempt: F,
) -> Result<EventStream, ExecutorFailure>
where
 F: FnMut(&str, usize) -> Fut,
 Fut: Future<Output = Result<EventStream, ExecutorFailure>>,
{
 let mut last_failure = ExecutorFailure::Transport {
 message: "no base URLs configured".to_string(),
 };
 for (index, url) in base_urls.iter().enumerate() {
 match attempt(url, index).await {
 Ok(stream) => return Ok(stream),
 Err(failure) => {
 let has_more = index + 1 < base_urls.len();
 let retryable =
 matches!(&failure, ExecutorFailure::Http { status, .. } if *status == RETRYABLE_STATUS)
 || matches!(failure, ExecutorFailure::Transport { .. });
 last_failure = failure;
 if !(has_more && retryable) {
 return Err(last_failure);
 }
 }
 }
 }
 Err(last_failure)
}

#[cfg(test)]
mod tests {
 use super::*;
 use std::sync::atomic::{AtomicUsize, Ordering};

 #[tokio::test]
 async fn advances_past_retryable_status_to_next_url() {
 let urls = vec!["https://a.example".to_string(), "https://b.example".to_string()];
 let calls = AtomicUsize::new(0);
 let result = execute_with_base_url_fallback(&urls, |_url, index| {
 calls.fetch_add(1, Ordering::SeqCst);
 async move {
 if index == 0 {
 Err(ExecutorFailure::Http {
 status: 429,
 headers: vec![],
 body_text: "rate limited".into(),
 })
 } else {
 let (_tx, rx) = tokio::sync::mpsc::channel(1);
 Ok(rx)
 }
 }
 })
 .await;
 assert!(result.is_ok());
 assert_eq!(calls.load(Ordering::SeqCst), 2);
 }

 #[tokio::test]
 async fn last_attempt_surfaces_its_error() {
 let urls = vec!["https://a.example".to_string()];
 let result = execute_with_base_url_fallback(&urls, |_url, _index| async {
 Err(ExecutorFailure::Http {
 status: 500,
 headers: vec![],
 body_text: "boom".into(),
 })
 })
 .await;
 assert!(matches!(result, Err(ExecutorFailure::Http { status: 500, .. })));
 }

 #[tokio::test]
 async fn non_retryable_status_does_not_advance() {
 let urls = vec!["https://a.example".to_string(), "https://b.example".to_string()];
 let calls = AtomicUsize::new(0);
 let result = execute_with_base_url_fallback(&urls, |_url, _index| {
 calls.fetch_add(1, Ordering::SeqCst);
 async {
 Err(ExecutorFailure::Http {
 status: 401,
 headers: vec![],
 body_text: "unauthorized".into(),
 })
 }
 })
 .await;
 assert!(result.is_err());
 assert_eq!(calls.load(Ordering::SeqCst), 1);
 }
}

//! The Token Refresher (C3): staleness detection and a provider-agnostic
//! retry-with-backoff wrapper. Individual provider refresh implementations
//! live in `cgate-provider-impl` and implement [`TokenRefresher`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Connection, InstantMillis};

/// `needsRefresh(conn) = conn.expiresAt && (conn.expiresAt - now) < bufferMs`.
/// A missing `expires_at` means "never refresh" (e.g. a Cursor connection,
/// whose tokens are imported manually and never expire from this gateway's
/// point of view).
pub fn needs_refresh(conn: &Connection, now: InstantMillis, buffer_ms: i64) -> bool {
 match conn.expires_at {
 Some(expires_at) => expires_at - now < buffer_ms,
 None => false,
 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
 pub access_token: String,
 pub refresh_token: Option<String>,
 pub expires_in_secs: i64,
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
 /// Returns `None` on failure (caller must not propagate the error; the
 /// request proceeds with the stale token ).
 async fn refresh(&self, conn: &Connection) -> Option<RefreshedTokens>;
}

/// `refreshWithRetry(fn, maxRetries = 3)`: retries on `None` with linear
/// backoff `attempt * 1000ms`. Never propagates an error; the caller
/// receives `None` and treats the existing token as "current best effort".
pub async fn refresh_with_retry<F, Fut>(max_retries: u32, mut attempt_fn: F) -> Option<RefreshedTokens>
where
 F: FnMut() -> Fut,
 Fut: Future<Output = Option<RefreshedTokens>>,
{
 for attempt in 1..=max_retries.max(1) {
 if let Some(tokens) = attempt_fn().await {
 return Some(tokens);
 }
 tracing::warn!(event = "token_refresh_attempt_failed", attempt);
 if attempt < max_retries {
 tokio::time::sleep(Duration::from_millis(1000 * attempt as u64)).await;
 }
 }
 None
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::model::{AuthType, ConnectionId, Provider, ProviderSpecificData, TestStatus};
 use std::sync::atomic::{AtomicU32, Ordering};

 fn sample_connection(expires_at: Option<i64>) -> Connection {
 Connection {
 id: ConnectionId(1),
 provider: Provider::Claude,
 auth_type: AuthType::OAuth,
 priority: 1,
 is_active: true,
 api_key: None,
 access_token: Some("tok".into()),
 refresh_token: Some("refresh".into()),
 expires_at,
 project_id: None,
 provider_specific_data: ProviderSpecificData::default(),
 test_status: TestStatus::Active,
 last_error: None,
 error_code: None,
 last_error_at: None,
 rate_limited_until: None,
 backoff_level: 0,
 last_used_at: None,
 consecutive_use_count: 0,
 }
 }

 #[test]
 fn missing_expiry_never_needs_refresh() {
 let conn = sample_connection(None);
 assert!(!needs_refresh(&conn, 1_000_000, 300_000));
 }

 #[test]
 fn s6_stale_when_inside_buffer() {
 // expires in 2 minutes, buffer is 5 minutes -> stale.
 let now = 0i64;
 let conn = sample_connection(Some(2 * 60_000));
 assert!(needs_refresh(&conn, now, 5 * 60_000));
 }

 #[test]
 fn not_stale_when_outside_buffer() {
 let now = 0i64;
 let conn = sample_connection(Some(10 * 60_000));
 assert!(!needs_refresh(&conn, now, 5 * 60_000));
 }

 #[tokio::test(start_paused = true)]
 async fn retry_wrapper_gives_up_after_max_retries() {
 let calls = AtomicU32::new(0);
 let result = refresh_with_retry(3, || {
 calls.fetch_add(1, Ordering::SeqCst);
 async { None }
 })
 .await;
 assert!(result.is_none());
 assert_eq!(calls.load(Ordering::SeqCst), 3);
 }

 #[tokio::test(start_paused = true)]
 async fn retry_wrapper_returns_first_success() {
 let calls = AtomicU32::new(0);
 let result = refresh_with_retry(3, || {
 let n = calls.fetch_add(1, Ordering::SeqCst);
 async move {
 if n == 1 {
 Some(RefreshedTokens {
 access_token: "new".into(),
 refresh_token: None,
 expires_in_secs: 3600,
 })
 } else {
 None
 }
 }
 })
 .await;
 assert_eq!(result.unwrap().access_token, "new");
 assert_eq!(calls.load(Ordering::SeqCst), 2);
 }
}

//! The Account Arbiter (C5): mutex-serialised connection selection across
//! fill-first and sticky-round-robin strategies, plus the mark-unavailable /
//! clear-error state transitions. Grounded on the concurrency shape of a
//! single mutex-guarded pool selector, a single guard around
//! read-then-write, but adapted to select over the
//! Credential Store collaborator instead of owning credential state itself,
//! and to fill-first/round-robin selection instead of an
//! unavailable-queue scheduler.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::classify::{classify, ClassifierConfig};
use crate::model::{Connection, ConnectionId, FallbackStrategy, Provider, Settings, now_millis};
use crate::store::{ConnectionFilter, ConnectionPatch, CredentialStore, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
 Selected(Connection),
 /// Every connection for the provider is currently in cooldown.
 AllRateLimited {
 retry_after_ms: i64,
 retry_after_human: String,
 last_error: Option<String>,
 last_error_code: Option<i32>,
 },
 /// The provider has zero configured connections at all.
 NoConnections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkUnavailableOutcome {
 pub should_fallback: bool,
 pub cooldown_ms: i64,
}

pub struct Arbiter<S: CredentialStore> {
 store: Arc<S>,
 classifier_config: ClassifierConfig,
 /// Process-wide selection lock: only one selection (across ALL
 /// providers) may be in flight at a time. Sharding by provider would be
 /// a valid optimisation but is not implemented here.
 selection_lock: Mutex<()>,
}

impl<S: CredentialStore> Arbiter<S> {
 pub fn new(store: Arc<S>) -> Self {
 Self {
 store,
 classifier_config: ClassifierConfig::default(),
 selection_lock: Mutex::new(()),
 }
 }

 pub fn with_classifier_config(mut self, config: ClassifierConfig) -> Self {
 self.classifier_config = config;
 self
 }

 pub async fn settings(&self) -> Result<Settings, StorageError> {
 self.store.get_settings().await
 }

 pub async fn select(
 &self,
 provider: Provider,
 exclude_id: Option<ConnectionId>,
 ) -> Result<SelectOutcome, StorageError> {
 let _guard = self.selection_lock.lock().await;
 let now = now_millis();

 let active = self
 .store
 .get_connections(ConnectionFilter {
 provider: Some(provider),
 is_active: Some(true),
 })
 .await?;

 if active.is_empty() {
 let all = self
 .store
 .get_connections(ConnectionFilter {
 provider: Some(provider),
 is_active: None,
 })
 .await?;
 return Ok(all_rate_limited_or_none(&all, now));
 }

 let candidates: Vec<&Connection> = active
 .iter()
 .filter(|c| Some(c.id) != exclude_id && !c.is_rate_limited(now))
 .collect();

 if candidates.is_empty() {
 return Ok(all_rate_limited_or_none(&active, now));
 }

 let settings = self.store.get_settings().await?;
 match settings.fallback_strategy {
 FallbackStrategy::FillFirst => {
 // `active` (and therefore `candidates`) is already
 // priority-sorted ascending by the store.
 Ok(SelectOutcome::Selected(candidates[0].clone()))
 }
 FallbackStrategy::RoundRobin => {
 self.select_round_robin(candidates, settings.sticky_round_robin_limit, now)
 .await
 }
 }
 }

 async fn select_round_robin(
 &self,
 mut candidates: Vec<&Connection>,
 sticky_limit: u32,
 now: i64,
 ) -> Result<SelectOutcome, StorageError> {
 candidates.sort_by(|a, b| b.last_used_at.unwrap_or(0).cmp(&a.last_used_at.unwrap_or(0)));
 let most_recent = candidates[0];

 let reuse_current = most_recent.last_used_at.is_some()
 && (most_recent.consecutive_use_count as u32) < sticky_limit;

 let chosen = if reuse_current {
 most_recent
 } else {
 // Least-recently-used, with connections that have never been
 // used (`last_used_at == None`) sorted first.
 candidates
 .iter()
 .min_by(|a, b| match (a.last_used_at, b.last_used_at) {
 (None, None) => std::cmp::Ordering::Equal,
 (None, Some(_)) => std::cmp::Ordering::Less,
 (Some(_), None) => std::cmp::Ordering::Greater,
 (Some(x), Some(y)) => x.cmp(&y),
 })
 .copied()
 .unwrap_or(most_recent)
 };

 let new_count = if reuse_current {
 chosen.consecutive_use_count + 1
 } else {
 1
 };
 let patch = ConnectionPatch {
 last_used_at: crate::model::Patch::Set(now),
 consecutive_use_count: Some(new_count),
 ..Default::default()
 };
 let updated = self.store.update_connection(chosen.id, patch).await?;
 Ok(SelectOutcome::Selected(updated))
 }

 /// Reads the connection's current backoff level, classifies the
 /// failure, and — if the classifier says to fall back — persists the
 /// cooldown window.
 pub async fn mark_account_unavailable(
 &self,
 id: ConnectionId,
 status: u16,
 error_text: &str,
 ) -> Result<MarkUnavailableOutcome, StorageError> {
 let current = self.store.get_connection(id).await?;
 let decision = classify(&self.classifier_config, status, error_text, current.backoff_level);

 if !decision.should_fallback {
 return Ok(MarkUnavailableOutcome {
 should_fallback: false,
 cooldown_ms: 0,
 });
 }

 let now = now_millis();
 let truncated_error: String = error_text.chars().take(100).collect();
 let patch = ConnectionPatch {
 rate_limited_until: crate::model::Patch::Set(now + decision.cooldown_ms),
 test_status: Some(crate::model::TestStatus::Unavailable),
 last_error: crate::model::Patch::Set(truncated_error),
 error_code: crate::model::Patch::Set(status as i32),
 last_error_at: crate::model::Patch::Set(now),
 backoff_level: decision.new_backoff_level,
 ..Default::default()
 };
 self.store.update_connection(id, patch).await?;

 Ok(MarkUnavailableOutcome {
 should_fallback: true,
 cooldown_ms: decision.cooldown_ms,
 })
 }

 /// No-op if the connection is already clean; otherwise atomically
 /// clears the error/cooldown fields and resets backoff.
 pub async fn clear_account_error(&self, snapshot: &Connection) -> Result<(), StorageError> {
 let already_clean = matches!(snapshot.test_status, crate::model::TestStatus::Active)
 && snapshot.last_error.is_none()
 && snapshot.rate_limited_until.is_none();
 if already_clean {
 return Ok(());
 }
 self.store
 .update_connection(snapshot.id, ConnectionPatch::clear_error())
 .await?;
 Ok(())
 }
}

fn all_rate_limited_or_none(connections: &[Connection], now: i64) -> SelectOutcome {
 let earliest = connections
 .iter()
 .filter(|c| c.rate_limited_until.is_some_and(|until| until > now))
 .min_by_key(|c| c.rate_limited_until.unwrap());

 match earliest {
 Some(conn) => {
 let retry_after_ms = conn.rate_limited_until.unwrap() - now;
 SelectOutcome::AllRateLimited {
 retry_after_ms,
 retry_after_human: format!("reset after {}s", (retry_after_ms as f64 / 1000.0).ceil() as i64),
 last_error: conn.last_error.clone(),
 last_error_code: conn.error_code,
 }
 }
 None => SelectOutcome::NoConnections,
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::model::{AuthType, ProviderSpecificData, TestStatus};
 use std::collections::HashMap;
 use std::sync::Mutex as StdMutex;

 struct FakeStore {
 connections: StdMutex<HashMap<ConnectionId, Connection>>,
 settings: Settings,
 }

 fn conn(id: i64, provider: Provider, priority: i64) -> Connection {
 Connection {
 id: ConnectionId(id),
 provider,
 auth_type: AuthType::OAuth,
 priority,
 is_active: true,
 api_key: None,
 access_token: Some("tok".into()),
 refresh_token: None,
 expires_at: None,
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

 #[async_trait::async_trait]
 impl CredentialStore for FakeStore {
 async fn get_connections(
 &self,
 filter: ConnectionFilter,
 ) -> Result<Vec<Connection>, StorageError> {
 let guard = self.connections.lock().unwrap();
 let mut rows: Vec<Connection> = guard
 .values()
 .filter(|c| filter.provider.is_none_or(|p| p == c.provider))
 .filter(|c| filter.is_active.is_none_or(|a| a == c.is_active))
 .cloned()
 .collect();
 rows.sort_by_key(|c| c.priority);
 Ok(rows)
 }

 async fn get_connection(&self, id: ConnectionId) -> Result<Connection, StorageError> {
 self.connections
 .lock()
 .unwrap()
 .get(&id)
 .cloned()
 .ok_or(StorageError::NotFound(id))
 }

 async fn update_connection(
 &self,
 id: ConnectionId,
 patch: ConnectionPatch,
 ) -> Result<Connection, StorageError> {
 let mut guard = self.connections.lock().unwrap();
 let conn = guard.get_mut(&id).ok_or(StorageError::NotFound(id))?;
 patch.apply(conn);
 Ok(conn.clone())
 }

 async fn create_connection(&self, mut conn: Connection) -> Result<Connection, StorageError> {
 let mut guard = self.connections.lock().unwrap();
 let next_id = guard.keys().map(|id| id.0).max().unwrap_or(0) + 1;
 conn.id = ConnectionId(next_id);
 guard.insert(conn.id, conn.clone());
 Ok(conn)
 }

 async fn get_settings(&self) -> Result<Settings, StorageError> {
 Ok(self.settings)
 }
 }

 fn fill_first_store(conns: Vec<Connection>) -> Arc<FakeStore> {
 Arc::new(FakeStore {
 connections: StdMutex::new(conns.into_iter().map(|c| (c.id, c)).collect()),
 settings: Settings {
 fallback_strategy: FallbackStrategy::FillFirst,
 ..Settings::default()
 },
 })
 }

 #[tokio::test]
 async fn s1_fill_first_falls_back_on_rate_limit() {
 let store = fill_first_store(vec![
 conn(1, Provider::Claude, 1),
 conn(2, Provider::Claude, 2),
 conn(3, Provider::Claude, 3),
 ]);
 let arbiter = Arbiter::new(store.clone());

 let first = arbiter.select(Provider::Claude, None).await.unwrap();
 assert_eq!(first, SelectOutcome::Selected(conn(1, Provider::Claude, 1)));

 arbiter
 .mark_account_unavailable(ConnectionId(1), 429, "rate limit exceeded")
 .await
 .unwrap();

 let second = arbiter
 .select(Provider::Claude, Some(ConnectionId(1)))
 .await
 .unwrap();
 match second {
 SelectOutcome::Selected(c) => assert_eq!(c.id, ConnectionId(2)),
 other => panic!("expected connection B, got {other:?}"),
 }
 }

 #[tokio::test]
 async fn s2_sticky_round_robin_cycles_after_limit() {
 let store = Arc::new(FakeStore {
 connections: StdMutex::new(
 vec![conn(1, Provider::Claude, 1), conn(2, Provider::Claude, 2)]
 .into_iter()
 .map(|c| (c.id, c))
 .collect(),
 ),
 settings: Settings {
 fallback_strategy: FallbackStrategy::RoundRobin,
 sticky_round_robin_limit: 2,
 ..Settings::default()
 },
 });
 let arbiter = Arbiter::new(store);

 let mut picks = Vec::new();
 for _ in 0..6 {
 match arbiter.select(Provider::Claude, None).await.unwrap() {
 SelectOutcome::Selected(c) => picks.push(c.id.0),
 other => panic!("unexpected {other:?}"),
 }
 }
 assert_eq!(picks, vec![1, 1, 2, 2, 1, 1]);
 }

 #[tokio::test]
 async fn s4_all_rate_limited_reports_retry_after() {
 let mut a = conn(1, Provider::Claude, 1);
 a.rate_limited_until = Some(now_millis() + 30_000);
 let store = fill_first_store(vec![a]);
 let arbiter = Arbiter::new(store);

 match arbiter.select(Provider::Claude, None).await.unwrap() {
 SelectOutcome::AllRateLimited { retry_after_ms, .. } => {
 assert!(retry_after_ms > 25_000 && retry_after_ms <= 30_000);
 }
 other => panic!("expected AllRateLimited, got {other:?}"),
 }
 }

 #[tokio::test]
 async fn clear_account_error_is_noop_when_already_clean() {
 let store = fill_first_store(vec![conn(1, Provider::Claude, 1)]);
 let arbiter = Arbiter::new(store.clone());
 let snapshot = arbiter.store.get_connection(ConnectionId(1)).await.unwrap();
 arbiter.clear_account_error(&snapshot).await.unwrap();
 // Unchanged: still no last_used_at bump, since clear was a no-op.
 let after = arbiter.store.get_connection(ConnectionId(1)).await.unwrap();
 assert_eq!(after, snapshot);
 }
}

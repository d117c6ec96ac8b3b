//! The Credential Store collaborator interface. The core never
//! touches a database directly; it only ever goes through this trait, which
//! `cgate-storage` implements (in-memory for tests/dev, SQLite via sea-orm
//! for production).

use async_trait::async_trait;

use crate::model::{Connection, ConnectionId, InstantMillis, Patch, Provider, Settings, TestStatus};

#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
 pub provider: Option<Provider>,
 pub is_active: Option<bool>,
}

/// Atomic partial update to one [`Connection`]. Every field defaults to
/// "leave alone"; nullable fields use [`Patch`] so a single call can both
/// set and explicitly clear different fields atomically.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPatch {
 pub is_active: Option<bool>,
 pub access_token: Patch<String>,
 pub refresh_token: Patch<String>,
 pub expires_at: Patch<InstantMillis>,
 pub test_status: Option<TestStatus>,
 pub last_error: Patch<String>,
 pub error_code: Patch<i32>,
 pub last_error_at: Patch<InstantMillis>,
 pub rate_limited_until: Patch<InstantMillis>,
 pub backoff_level: Option<i32>,
 pub last_used_at: Patch<InstantMillis>,
 pub consecutive_use_count: Option<i32>,
}

impl ConnectionPatch {
 /// The patch applied after a successful 2xx response: clears
 /// `rate_limited_until`, `last_error`, `error_code`, resets
 /// `backoff_level` to zero.
 pub fn clear_error() -> Self {
 Self {
 rate_limited_until: Patch::Clear,
 last_error: Patch::Clear,
 error_code: Patch::Clear,
 backoff_level: Some(0),
 test_status: Some(TestStatus::Active),
 ..Default::default()
 }
 }

 pub fn apply(self, conn: &mut Connection) {
 if let Some(is_active) = self.is_active {
 conn.is_active = is_active;
 }
 self.access_token.apply(&mut conn.access_token);
 self.refresh_token.apply(&mut conn.refresh_token);
 self.expires_at.apply(&mut conn.expires_at);
 if let Some(test_status) = self.test_status {
 conn.test_status = test_status;
 }
 self.last_error.apply(&mut conn.last_error);
 self.error_code.apply(&mut conn.error_code);
 self.last_error_at.apply(&mut conn.last_error_at);
 self.rate_limited_until.apply(&mut conn.rate_limited_until);
 if let Some(backoff_level) = self.backoff_level {
 conn.backoff_level = backoff_level;
 }
 self.last_used_at.apply(&mut conn.last_used_at);
 if let Some(consecutive_use_count) = self.consecutive_use_count {
 conn.consecutive_use_count = consecutive_use_count;
 }
 }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
 #[error("connection {0} not found")]
 NotFound(ConnectionId),
 #[error("storage backend error: {0}")]
 Backend(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
 /// Connections matching the filter, sorted by `priority` ascending.
 async fn get_connections(&self, filter: ConnectionFilter) -> Result<Vec<Connection>, StorageError>;

 async fn get_connection(&self, id: ConnectionId) -> Result<Connection, StorageError>;

 /// Persists a new connection, assigning it a fresh id (any id on `conn`
 /// is ignored).
 async fn create_connection(&self, conn: Connection) -> Result<Connection, StorageError>;

 /// Atomic partial update by id.
 async fn update_connection(
 &self,
 id: ConnectionId,
 patch: ConnectionPatch,
 ) -> Result<Connection, StorageError>;

 async fn get_settings(&self) -> Result<Settings, StorageError>;
}

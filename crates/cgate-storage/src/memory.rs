//! In-memory `CredentialStore`/`ComboStore`/`ConfigStore`, used by tests and
//! as the default store for a dev/single-process run without a DB. This is
//! the "plus an in-memory one" half of the storage crate's own
//! two-implementation design.

use std::sync::Mutex;

use async_trait::async_trait;
use cgate_common::GlobalConfig;
use cgate_provider_core::{Combo, Connection, ConnectionFilter, ConnectionId, ConnectionPatch, Settings};

use crate::{ComboStore, ConfigStore, CredentialStore, StorageError};

#[derive(Debug, Default)]
struct State {
    connections: Vec<Connection>,
    next_id: i64,
    combos: Vec<Combo>,
    global_config: Option<GlobalConfig>,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                connections: Vec::new(),
                next_id: 1,
                combos: Vec::new(),
                global_config: None,
            }),
        }
    }

    /// Seeds a connection for tests/bootstrap, assigning the next id.
    pub fn insert_connection(&self, mut conn: Connection) -> ConnectionId {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        let id = ConnectionId(state.next_id);
        state.next_id += 1;
        conn.id = id;
        state.connections.push(conn);
        id
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_connections(&self, filter: ConnectionFilter) -> Result<Vec<Connection>, StorageError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        let mut matched: Vec<Connection> = state
            .connections
            .iter()
            .filter(|c| filter.provider.is_none_or(|p| p == c.provider))
            .filter(|c| filter.is_active.is_none_or(|active| active == c.is_active))
            .cloned()
            .collect();
        matched.sort_by_key(|c| c.priority);
        Ok(matched)
    }

    async fn get_connection(&self, id: ConnectionId) -> Result<Connection, StorageError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        state
            .connections
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StorageError::NotFound(id))
    }

    async fn create_connection(&self, conn: Connection) -> Result<Connection, StorageError> {
        Ok(self.get_connection(self.insert_connection(conn)).await?)
    }

    async fn update_connection(
        &self,
        id: ConnectionId,
        patch: ConnectionPatch,
    ) -> Result<Connection, StorageError> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        let conn = state
            .connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StorageError::NotFound(id))?;
        patch.apply(conn);
        Ok(conn.clone())
    }

    async fn get_settings(&self) -> Result<Settings, StorageError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state
            .global_config
            .as_ref()
            .map(GlobalConfig::settings)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ComboStore for MemoryStore {
    async fn list_combos(&self) -> Result<Vec<Combo>, StorageError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.combos.clone())
    }

    async fn get_combo(&self, name: &str) -> Result<Option<Combo>, StorageError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.combos.iter().find(|c| c.name == name).cloned())
    }

    async fn upsert_combo(&self, combo: Combo) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        if let Some(existing) = state.combos.iter_mut().find(|c| c.name == combo.name) {
            *existing = combo;
        } else {
            state.combos.push(combo);
        }
        Ok(())
    }

    async fn delete_combo(&self, name: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        state.combos.retain(|c| c.name != name);
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load_global_config(&self) -> Result<Option<GlobalConfig>, StorageError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.global_config.clone())
    }

    async fn upsert_global_config(&self, config: &GlobalConfig) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        state.global_config = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cgate_provider_core::{AuthType, Provider, ProviderSpecificData, TestStatus};

    use super::*;

    fn sample(provider: Provider, priority: i64, is_active: bool) -> Connection {
        Connection {
            id: ConnectionId(0),
            provider,
            auth_type: AuthType::ApiKey,
            priority,
            is_active,
            api_key: Some("k".into()),
            access_token: None,
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

    #[tokio::test]
    async fn get_connections_filters_and_sorts_by_priority() {
        let store = MemoryStore::new();
        store.insert_connection(sample(Provider::Claude, 2, true));
        store.insert_connection(sample(Provider::Claude, 1, true));
        store.insert_connection(sample(Provider::Codex, 0, true));

        let got = store
            .get_connections(ConnectionFilter {
                provider: Some(Provider::Claude),
                is_active: None,
            })
            .await
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].priority, 1);
        assert_eq!(got[1].priority, 2);
    }

    #[tokio::test]
    async fn update_connection_applies_patch_atomically() {
        let store = MemoryStore::new();
        let id = store.insert_connection(sample(Provider::Claude, 0, true));

        let updated = store
            .update_connection(id, ConnectionPatch::clear_error())
            .await
            .unwrap();
        assert_eq!(updated.backoff_level, 0);
        assert!(updated.rate_limited_until.is_none());
    }

    #[tokio::test]
    async fn get_connection_missing_id_errors() {
        let store = MemoryStore::new();
        let err = store.get_connection(ConnectionId(99)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ConnectionId(99))));
    }

    #[tokio::test]
    async fn combo_round_trips() {
        let store = MemoryStore::new();
        store
            .upsert_combo(Combo {
                name: "fast".into(),
                models: vec!["claude/sonnet".into(), "codex/mini".into()],
                description: None,
            })
            .await
            .unwrap();
        let got = store.get_combo("fast").await.unwrap();
        assert_eq!(got.unwrap().models.len(), 2);
    }
}

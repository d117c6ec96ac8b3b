//! A single concrete type over either storage backend, so callers that need
//! one monomorphized type regardless of which backend was chosen at startup
//! (the Account Arbiter, the axum application state) don't have to pick a
//! backend at compile time or reach for `dyn` object safety around an
//! `async_trait` interface.

use async_trait::async_trait;
use cgate_common::GlobalConfig;
use cgate_provider_core::{Combo, Connection, ConnectionFilter, ConnectionId, ConnectionPatch, Settings};

use crate::{ComboStore, ConfigStore, CredentialStore, MemoryStore, SeaOrmStore, StorageError};

pub enum Store {
    Memory(MemoryStore),
    SeaOrm(SeaOrmStore),
}

#[async_trait]
impl CredentialStore for Store {
    async fn get_connections(&self, filter: ConnectionFilter) -> Result<Vec<Connection>, StorageError> {
        match self {
            Store::Memory(store) => store.get_connections(filter).await,
            Store::SeaOrm(store) => store.get_connections(filter).await,
        }
    }

    async fn get_connection(&self, id: ConnectionId) -> Result<Connection, StorageError> {
        match self {
            Store::Memory(store) => store.get_connection(id).await,
            Store::SeaOrm(store) => store.get_connection(id).await,
        }
    }

    async fn create_connection(&self, conn: Connection) -> Result<Connection, StorageError> {
        match self {
            Store::Memory(store) => store.create_connection(conn).await,
            Store::SeaOrm(store) => store.create_connection(conn).await,
        }
    }

    async fn update_connection(
        &self,
        id: ConnectionId,
        patch: ConnectionPatch,
    ) -> Result<Connection, StorageError> {
        match self {
            Store::Memory(store) => store.update_connection(id, patch).await,
            Store::SeaOrm(store) => store.update_connection(id, patch).await,
        }
    }

    async fn get_settings(&self) -> Result<Settings, StorageError> {
        match self {
            Store::Memory(store) => store.get_settings().await,
            Store::SeaOrm(store) => store.get_settings().await,
        }
    }
}

#[async_trait]
impl ComboStore for Store {
    async fn list_combos(&self) -> Result<Vec<Combo>, StorageError> {
        match self {
            Store::Memory(store) => store.list_combos().await,
            Store::SeaOrm(store) => store.list_combos().await,
        }
    }

    async fn get_combo(&self, name: &str) -> Result<Option<Combo>, StorageError> {
        match self {
            Store::Memory(store) => store.get_combo(name).await,
            Store::SeaOrm(store) => store.get_combo(name).await,
        }
    }

    async fn upsert_combo(&self, combo: Combo) -> Result<(), StorageError> {
        match self {
            Store::Memory(store) => store.upsert_combo(combo).await,
            Store::SeaOrm(store) => store.upsert_combo(combo).await,
        }
    }

    async fn delete_combo(&self, name: &str) -> Result<(), StorageError> {
        match self {
            Store::Memory(store) => store.delete_combo(name).await,
            Store::SeaOrm(store) => store.delete_combo(name).await,
        }
    }
}

#[async_trait]
impl ConfigStore for Store {
    async fn load_global_config(&self) -> Result<Option<GlobalConfig>, StorageError> {
        match self {
            Store::Memory(store) => store.load_global_config().await,
            Store::SeaOrm(store) => store.load_global_config().await,
        }
    }

    async fn upsert_global_config(&self, config: &GlobalConfig) -> Result<(), StorageError> {
        match self {
            Store::Memory(store) => store.upsert_global_config(config).await,
            Store::SeaOrm(store) => store.upsert_global_config(config).await,
        }
    }
}

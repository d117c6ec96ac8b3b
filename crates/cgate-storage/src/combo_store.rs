//! Combo CRUD, kept separate from [`cgate_provider_core::store::CredentialStore`]
//! since combos are a gateway-level concept (name -> ordered `provider/model`
//! list) the provider core never looks at.

use async_trait::async_trait;
use cgate_provider_core::Combo;

use crate::StorageError;

#[async_trait]
pub trait ComboStore: Send + Sync {
    async fn list_combos(&self) -> Result<Vec<Combo>, StorageError>;
    async fn get_combo(&self, name: &str) -> Result<Option<Combo>, StorageError>;
    async fn upsert_combo(&self, combo: Combo) -> Result<(), StorageError>;
    async fn delete_combo(&self, name: &str) -> Result<(), StorageError>;
}

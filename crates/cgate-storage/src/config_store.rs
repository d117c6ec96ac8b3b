//! Persists the DB layer of the CLI > ENV > DB merge config precedence,
//! grounded on a `load_global_config`/`upsert_global_config` pair over a
//! single-row settings table.

use async_trait::async_trait;
use cgate_common::GlobalConfig;

use crate::StorageError;

#[async_trait]
pub trait ConfigStore: Send + Sync {
 async fn load_global_config(&self) -> Result<Option<GlobalConfig>, StorageError>;
 async fn upsert_global_config(&self, config: &GlobalConfig) -> Result<(), StorageError>;
}

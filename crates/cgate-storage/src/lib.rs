//! Credential Store implementations: an in-memory store for tests and
//! single-process dev runs, and a SQLite-backed one via sea-orm for
//! everything else. Both implement
//! `cgate_provider_core::store::CredentialStore` plus this crate's own
//! `ComboStore`/`ConfigStore` traits for the two other persisted shapes
//! (combos, the merged global config).

pub mod combo_store;
pub mod config_store;
pub mod db;
pub mod entities;
pub mod mapping;
pub mod memory;
pub mod seaorm_store;
pub mod store;

pub use cgate_provider_core::{CredentialStore, StorageError};
pub use combo_store::ComboStore;
pub use config_store::ConfigStore;
pub use memory::MemoryStore;
pub use seaorm_store::SeaOrmStore;
pub use store::Store;

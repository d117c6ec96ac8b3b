//! SQLite-backed stores, grounded on `db.rs` connection
//! caching and `entities/credentials.rs`/`entities/global_config.rs` entity
//! style. `schema-sync` (already in the sea-orm feature set) is
//! used to create tables from the entity definitions at startup instead of
//! a migrations directory.

use async_trait::async_trait;
use cgate_common::GlobalConfig;
use cgate_provider_core::{Combo, Connection, ConnectionFilter, ConnectionId, ConnectionPatch, Settings};
use sea_orm::{
 ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
 QueryOrder, Schema,
};
use time::OffsetDateTime;

use crate::entities::{combos, connections, global_config};
use crate::mapping::{combo_from_model, connection_from_model, connection_to_columns};
use crate::{db, ComboStore, ConfigStore, CredentialStore, StorageError};

pub struct SeaOrmStore {
 conn: DatabaseConnection,
}

fn db_err(e: sea_orm::DbErr) -> StorageError {
 StorageError::Backend(e.to_string())
}

impl SeaOrmStore {
 pub async fn connect(dsn: &str) -> Result<Self, StorageError> {
 let conn = db::connect_shared(dsn).await.map_err(db_err)?;
 Ok(Self { conn })
 }

 /// Creates the `connections`/`combos`/`global_config` tables if they
 /// don't already exist.
 pub async fn sync_schema(&self) -> Result<(), StorageError> {
 let backend = self.conn.get_database_backend();
 let schema = Schema::new(backend);
 let statements = [
 schema
 .create_table_from_entity(connections::Entity)
 .if_not_exists()
 .to_owned(),
 schema
 .create_table_from_entity(combos::Entity)
 .if_not_exists()
 .to_owned(),
 schema
 .create_table_from_entity(global_config::Entity)
 .if_not_exists()
 .to_owned(),
 ];
 for statement in statements {
 self.conn
 .execute_raw(backend.build(&statement))
 .await
 .map_err(db_err)?;
 }
 Ok(())
 }
}

#[async_trait]
impl CredentialStore for SeaOrmStore {
 async fn get_connections(&self, filter: ConnectionFilter) -> Result<Vec<Connection>, StorageError> {
 let mut query = connections::Entity::find();
 if let Some(provider) = filter.provider {
 query = query.filter(connections::Column::Provider.eq(provider.to_string()));
 }
 if let Some(is_active) = filter.is_active {
 query = query.filter(connections::Column::IsActive.eq(is_active));
 }
 let models = query
 .order_by_asc(connections::Column::Priority)
 .all(&self.conn)
 .await.map_err(db_err)?;
 models.into_iter().map(connection_from_model).collect()
 }

 async fn get_connection(&self, id: ConnectionId) -> Result<Connection, StorageError> {
 let model = connections::Entity::find_by_id(id.0)
 .one(&self.conn)
 .await.map_err(db_err)?
 .ok_or(StorageError::NotFound(id))?;
 connection_from_model(model)
 }

 async fn create_connection(&self, conn: Connection) -> Result<Connection, StorageError> {
 let columns = connection_to_columns(&conn)?;
 let active = connections::ActiveModel {
 id: sea_orm::ActiveValue::NotSet,
 provider: Set(columns.provider),
 auth_type: Set(columns.auth_type),
 priority: Set(columns.priority),
 is_active: Set(columns.is_active),
 api_key: Set(columns.api_key),
 access_token: Set(columns.access_token),
 refresh_token: Set(columns.refresh_token),
 expires_at: Set(columns.expires_at),
 project_id: Set(columns.project_id),
 provider_specific_data: Set(columns.provider_specific_data),
 test_status: Set(columns.test_status),
 last_error: Set(columns.last_error),
 error_code: Set(columns.error_code),
 last_error_at: Set(columns.last_error_at),
 rate_limited_until: Set(columns.rate_limited_until),
 backoff_level: Set(columns.backoff_level),
 last_used_at: Set(columns.last_used_at),
 consecutive_use_count: Set(columns.consecutive_use_count),
 created_at: Set(now()),
 updated_at: Set(now()),
 };
 let inserted = connections::Entity::insert(active)
 .exec_with_returning(&self.conn)
 .await
 .map_err(db_err)?;
 connection_from_model(inserted)
 }

 async fn update_connection(
 &self,
 id: ConnectionId,
 patch: ConnectionPatch,
 ) -> Result<Connection, StorageError> {
 let model = connections::Entity::find_by_id(id.0)
 .one(&self.conn)
 .await.map_err(db_err)?
 .ok_or(StorageError::NotFound(id))?;
 let mut conn = connection_from_model(model)?;
 patch.apply(&mut conn);

 let columns = connection_to_columns(&conn)?;
 let active = connections::ActiveModel {
 id: Set(id.0),
 provider: Set(columns.provider),
 auth_type: Set(columns.auth_type),
 priority: Set(columns.priority),
 is_active: Set(columns.is_active),
 api_key: Set(columns.api_key),
 access_token: Set(columns.access_token),
 refresh_token: Set(columns.refresh_token),
 expires_at: Set(columns.expires_at),
 project_id: Set(columns.project_id),
 provider_specific_data: Set(columns.provider_specific_data),
 test_status: Set(columns.test_status),
 last_error: Set(columns.last_error),
 error_code: Set(columns.error_code),
 last_error_at: Set(columns.last_error_at),
 rate_limited_until: Set(columns.rate_limited_until),
 backoff_level: Set(columns.backoff_level),
 last_used_at: Set(columns.last_used_at),
 consecutive_use_count: Set(columns.consecutive_use_count),
 created_at: sea_orm::ActiveValue::NotSet,
 updated_at: Set(now()),
 };
 connections::Entity::update(active).exec(&self.conn).await.map_err(db_err)?;
 Ok(conn)
 }

 async fn get_settings(&self) -> Result<Settings, StorageError> {
 let row = global_config::Entity::find()
 .one(&self.conn)
 .await.map_err(db_err)?;
 Ok(match row {
 Some(row) => {
 let config: GlobalConfig = serde_json::from_value(row.config_json)
 .map_err(|e| StorageError::Backend(e.to_string()))?;
 config.settings()
 }
 None => Settings::default(),
 })
 }
}

#[async_trait]
impl ComboStore for SeaOrmStore {
 async fn list_combos(&self) -> Result<Vec<Combo>, StorageError> {
 let models = combos::Entity::find().all(&self.conn).await.map_err(db_err)?;
 models.into_iter().map(combo_from_model).collect()
 }

 async fn get_combo(&self, name: &str) -> Result<Option<Combo>, StorageError> {
 let model = combos::Entity::find()
 .filter(combos::Column::Name.eq(name))
 .one(&self.conn)
 .await.map_err(db_err)?;
 model.map(combo_from_model).transpose()
 }

 async fn upsert_combo(&self, combo: Combo) -> Result<(), StorageError> {
 let existing = combos::Entity::find()
 .filter(combos::Column::Name.eq(combo.name.clone()))
 .one(&self.conn)
 .await.map_err(db_err)?;
 let models_json = serde_json::to_value(&combo.models)
 .map_err(|e| StorageError::Backend(e.to_string()))?;

 match existing {
 Some(row) => {
 let active = combos::ActiveModel {
 id: Set(row.id),
 name: Set(combo.name),
 models_json: Set(models_json),
 description: Set(combo.description),
 updated_at: Set(now()),
 };
 combos::Entity::update(active).exec(&self.conn).await.map_err(db_err)?;
 }
 None => {
 let active = combos::ActiveModel {
 id: sea_orm::ActiveValue::NotSet,
 name: Set(combo.name),
 models_json: Set(models_json),
 description: Set(combo.description),
 updated_at: Set(now()),
 };
 combos::Entity::insert(active).exec(&self.conn).await.map_err(db_err)?;
 }
 }
 Ok(())
 }

 async fn delete_combo(&self, name: &str) -> Result<(), StorageError> {
 combos::Entity::delete_many()
 .filter(combos::Column::Name.eq(name))
 .exec(&self.conn)
 .await.map_err(db_err)?;
 Ok(())
 }
}

#[async_trait]
impl ConfigStore for SeaOrmStore {
 async fn load_global_config(&self) -> Result<Option<GlobalConfig>, StorageError> {
 let row = global_config::Entity::find().one(&self.conn).await.map_err(db_err)?;
 row.map(|row| {
 serde_json::from_value(row.config_json).map_err(|e| StorageError::Backend(e.to_string()))
 })
 .transpose()
 }

 async fn upsert_global_config(&self, config: &GlobalConfig) -> Result<(), StorageError> {
 let config_json =
 serde_json::to_value(config).map_err(|e| StorageError::Backend(e.to_string()))?;
 let existing = global_config::Entity::find().one(&self.conn).await.map_err(db_err)?;
 match existing {
 Some(row) => {
 let active = global_config::ActiveModel {
 id: Set(row.id),
 config_json: Set(config_json),
 updated_at: Set(now()),
 };
 global_config::Entity::update(active).exec(&self.conn).await.map_err(db_err)?;
 }
 None => {
 let active = global_config::ActiveModel {
 id: Set(1),
 config_json: Set(config_json),
 updated_at: Set(now()),
 };
 global_config::Entity::insert(active).exec(&self.conn).await.map_err(db_err)?;
 }
 }
 Ok(())
 }
}

fn now() -> OffsetDateTime {
 OffsetDateTime::now_utc()
}

//! Conversions between the sea-orm row shapes in `entities` and the plain
//! domain types `cgate-provider-core` works with. Kept separate from the
//! store implementations so the row<->domain mapping can be read (and
//! tested) on its own.

use std::str::FromStr;

use cgate_provider_core::{AuthType, Combo, Connection, ConnectionId, Provider, TestStatus};

use crate::entities::{combos, connections};
use crate::StorageError;

pub fn auth_type_as_str(auth_type: AuthType) -> &'static str {
    match auth_type {
        AuthType::OAuth => "oauth",
        AuthType::ApiKey => "api-key",
    }
}

pub fn auth_type_from_str(s: &str) -> Result<AuthType, StorageError> {
    match s {
        "oauth" => Ok(AuthType::OAuth),
        "api-key" => Ok(AuthType::ApiKey),
        other => Err(StorageError::Backend(format!("unknown auth_type {other:?}"))),
    }
}

pub fn test_status_as_str(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Active => "active",
        TestStatus::Unavailable => "unavailable",
        TestStatus::Expired => "expired",
        TestStatus::Error => "error",
        TestStatus::Success => "success",
    }
}

pub fn test_status_from_str(s: &str) -> Result<TestStatus, StorageError> {
    match s {
        "active" => Ok(TestStatus::Active),
        "unavailable" => Ok(TestStatus::Unavailable),
        "expired" => Ok(TestStatus::Expired),
        "error" => Ok(TestStatus::Error),
        "success" => Ok(TestStatus::Success),
        other => Err(StorageError::Backend(format!("unknown test_status {other:?}"))),
    }
}

pub fn connection_from_model(model: connections::Model) -> Result<Connection, StorageError> {
    Ok(Connection {
        id: ConnectionId(model.id),
        provider: Provider::from_str(&model.provider)
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        auth_type: auth_type_from_str(&model.auth_type)?,
        priority: model.priority,
        is_active: model.is_active,
        api_key: model.api_key,
        access_token: model.access_token,
        refresh_token: model.refresh_token,
        expires_at: model.expires_at,
        project_id: model.project_id,
        provider_specific_data: serde_json::from_value(model.provider_specific_data)
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        test_status: test_status_from_str(&model.test_status)?,
        last_error: model.last_error,
        error_code: model.error_code,
        last_error_at: model.last_error_at,
        rate_limited_until: model.rate_limited_until,
        backoff_level: model.backoff_level,
        last_used_at: model.last_used_at,
        consecutive_use_count: model.consecutive_use_count,
    })
}

/// Flattens a [`Connection`] into the plain scalar fields an `ActiveModel`
/// needs, leaving `id`/`created_at`/`updated_at` to the caller (insert vs.
/// update need different handling for those).
pub struct ConnectionColumns {
    pub provider: String,
    pub auth_type: String,
    pub priority: i64,
    pub is_active: bool,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub project_id: Option<String>,
    pub provider_specific_data: serde_json::Value,
    pub test_status: String,
    pub last_error: Option<String>,
    pub error_code: Option<i32>,
    pub last_error_at: Option<i64>,
    pub rate_limited_until: Option<i64>,
    pub backoff_level: i32,
    pub last_used_at: Option<i64>,
    pub consecutive_use_count: i32,
}

pub fn connection_to_columns(conn: &Connection) -> Result<ConnectionColumns, StorageError> {
    Ok(ConnectionColumns {
        provider: conn.provider.to_string(),
        auth_type: auth_type_as_str(conn.auth_type).to_string(),
        priority: conn.priority,
        is_active: conn.is_active,
        api_key: conn.api_key.clone(),
        access_token: conn.access_token.clone(),
        refresh_token: conn.refresh_token.clone(),
        expires_at: conn.expires_at,
        project_id: conn.project_id.clone(),
        provider_specific_data: serde_json::to_value(&conn.provider_specific_data)
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        test_status: test_status_as_str(conn.test_status).to_string(),
        last_error: conn.last_error.clone(),
        error_code: conn.error_code,
        last_error_at: conn.last_error_at,
        rate_limited_until: conn.rate_limited_until,
        backoff_level: conn.backoff_level,
        last_used_at: conn.last_used_at,
        consecutive_use_count: conn.consecutive_use_count,
    })
}

pub fn combo_from_model(model: combos::Model) -> Result<Combo, StorageError> {
    Ok(Combo {
        name: model.name,
        models: serde_json::from_value(model.models_json)
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        description: model.description,
    })
}

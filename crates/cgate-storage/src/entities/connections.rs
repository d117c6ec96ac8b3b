use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub provider: String,
    pub auth_type: String,
    pub priority: i64,
    pub is_active: bool,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub project_id: Option<String>,
    pub provider_specific_data: Json,
    pub test_status: String,
    pub last_error: Option<String>,
    pub error_code: Option<i32>,
    pub last_error_at: Option<i64>,
    pub rate_limited_until: Option<i64>,
    pub backoff_level: i32,
    pub last_used_at: Option<i64>,
    pub consecutive_use_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}

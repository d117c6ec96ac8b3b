//! Shared configuration types used across the `cgate-*` crate family.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
 #[error("missing required global config field: {0}")]
 MissingField(&'static str),
}

/// Process-wide fallback strategy for the Account Arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
 FillFirst,
 RoundRobin,
}

impl Default for FallbackStrategy {
 fn default() -> Self {
 FallbackStrategy::FillFirst
 }
}

/// The process-wide knobs the Account Arbiter reads on every selection.
/// Split out of [`GlobalConfig`] so `cgate-provider-core` can depend on this
/// crate for the type without depending on the CLI/DB merge machinery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
 pub fallback_strategy: FallbackStrategy,
 pub sticky_round_robin_limit: u32,
 pub token_expiry_buffer_ms: i64,
}

impl Default for Settings {
 fn default() -> Self {
 Self {
 fallback_strategy: FallbackStrategy::default(),
 sticky_round_robin_limit: 3,
 token_expiry_buffer_ms: 5 * 60 * 1000,
 }
 }
}

/// Final, merged global configuration used by the running process.
///
/// Merge order (after DB connection): CLI > ENV > DB, then persist back to DB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
 pub host: String,
 pub port: u16,
 /// Stored as a hash (not plaintext).
 pub admin_key_hash: String,
 /// Optional outbound proxy (for upstream egress).
 pub proxy: Option<String>,
 /// Database DSN used for this process.
 pub dsn: String,
 pub fallback_strategy: FallbackStrategy,
 pub sticky_round_robin_limit: u32,
 pub token_expiry_buffer_ms: i64,
}

impl GlobalConfig {
 pub fn settings(&self) -> Settings {
 Settings {
 fallback_strategy: self.fallback_strategy,
 sticky_round_robin_limit: self.sticky_round_robin_limit,
 token_expiry_buffer_ms: self.token_expiry_buffer_ms,
 }
 }
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfigPatch {
 pub host: Option<String>,
 pub port: Option<u16>,
 pub admin_key_hash: Option<String>,
 pub proxy: Option<String>,
 pub dsn: Option<String>,
 pub fallback_strategy: Option<FallbackStrategy>,
 pub sticky_round_robin_limit: Option<u32>,
 pub token_expiry_buffer_ms: Option<i64>,
}

impl GlobalConfigPatch {
 pub fn overlay(&mut self, other: GlobalConfigPatch) {
 if other.host.is_some() {
 self.host = other.host;
 }
 if other.port.is_some() {
 self.port = other.port;
 }
 if other.admin_key_hash.is_some() {
 self.admin_key_hash = other.admin_key_hash;
 }
 if other.proxy.is_some() {
 self.proxy = other.proxy;
 }
 if other.dsn.is_some() {
 self.dsn = other.dsn;
 }
 if other.fallback_strategy.is_some() {
 self.fallback_strategy = other.fallback_strategy;
 }
 if other.sticky_round_robin_limit.is_some() {
 self.sticky_round_robin_limit = other.sticky_round_robin_limit;
 }
 if other.token_expiry_buffer_ms.is_some() {
 self.token_expiry_buffer_ms = other.token_expiry_buffer_ms;
 }
 }

 pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
 Ok(GlobalConfig {
 host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
 port: self.port.unwrap_or(8787),
 admin_key_hash: self
 .admin_key_hash
 .ok_or(GlobalConfigError::MissingField("admin_key_hash"))?,
 proxy: self.proxy,
 dsn: self.dsn.ok_or(GlobalConfigError::MissingField("dsn"))?,
 fallback_strategy: self.fallback_strategy.unwrap_or_default(),
 sticky_round_robin_limit: self.sticky_round_robin_limit.unwrap_or(3),
 token_expiry_buffer_ms: self.token_expiry_buffer_ms.unwrap_or(5 * 60 * 1000),
 })
 }
}

impl From<GlobalConfig> for GlobalConfigPatch {
 fn from(value: GlobalConfig) -> Self {
 Self {
 host: Some(value.host),
 port: Some(value.port),
 admin_key_hash: Some(value.admin_key_hash),
 proxy: value.proxy,
 dsn: Some(value.dsn),
 fallback_strategy: Some(value.fallback_strategy),
 sticky_round_robin_limit: Some(value.sticky_round_robin_limit),
 token_expiry_buffer_ms: Some(value.token_expiry_buffer_ms),
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn overlay_prefers_later_values() {
 let mut base = GlobalConfigPatch {
 host: Some("127.0.0.1".into()),
 port: Some(8080),
 ..Default::default()
 };
 base.overlay(GlobalConfigPatch {
 port: Some(9090),
 ..Default::default()
 });
 assert_eq!(base.host.as_deref(), Some("127.0.0.1"));
 assert_eq!(base.port, Some(9090));
 }

 #[test]
 fn into_config_requires_dsn_and_admin_key() {
 let patch = GlobalConfigPatch::default();
 assert!(matches!(
 patch.into_config(),
 Err(GlobalConfigError::MissingField("admin_key_hash"))
 ));
 }
}

//! The data model shared by the Credential Store, the Account Arbiter, and
//! the Provider Executors: one credential ("connection") per upstream
//! account, static per-provider configuration, process-wide settings, combo
//! aliases, and the wire-agnostic stream event shape executors emit.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque identifier for a [`Connection`]. Newtype over the Credential
/// Store's primary key so callers can't accidentally mix it up with a
/// raw row id from an unrelated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub i64);

impl fmt::Display for ConnectionId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "{}", self.0)
 }
}

/// The closed set of upstream providers this gateway fans requests out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
 Cursor,
 Claude,
 Codex,
 GeminiCli,
 Antigravity,
 GithubCopilot,
 Kiro,
 Qwen,
 IFlow,
 OpenAiCompatible,
 AnthropicCompatible,
}

impl Provider {
 pub fn as_str(&self) -> &'static str {
 match self {
 Provider::Cursor => "cursor",
 Provider::Claude => "claude",
 Provider::Codex => "codex",
 Provider::GeminiCli => "gemini-cli",
 Provider::Antigravity => "antigravity",
 Provider::GithubCopilot => "github",
 Provider::Kiro => "kiro",
 Provider::Qwen => "qwen",
 Provider::IFlow => "iflow",
 Provider::OpenAiCompatible => "openai-compatible",
 Provider::AnthropicCompatible => "anthropic-compatible",
 }
 }
}

impl fmt::Display for Provider {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 f.write_str(self.as_str())
 }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown provider tag: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
 type Err = UnknownProvider;

 fn from_str(s: &str) -> Result<Self, Self::Err> {
 match s {
 "cursor" => Ok(Provider::Cursor),
 "claude" => Ok(Provider::Claude),
 "codex" => Ok(Provider::Codex),
 "gemini-cli" => Ok(Provider::GeminiCli),
 "antigravity" => Ok(Provider::Antigravity),
 "github" => Ok(Provider::GithubCopilot),
 "kiro" => Ok(Provider::Kiro),
 "qwen" => Ok(Provider::Qwen),
 "iflow" => Ok(Provider::IFlow),
 "openai-compatible" => Ok(Provider::OpenAiCompatible),
 "anthropic-compatible" => Ok(Provider::AnthropicCompatible),
 other => Err(UnknownProvider(other.to_string())),
 }
 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthType {
 OAuth,
 ApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
 Active,
 Unavailable,
 Expired,
 Error,
 Success,
}

/// Per-provider credential metadata that doesn't fit the common `Connection`
/// shape. Modeled as a tagged union keyed by provider, since "the shape of
/// providerSpecificData
/// varies by provider ... model as a tagged union keyed by provider tag."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProviderSpecificData {
 Cursor {
 machine_id: String,
 #[serde(default = "default_true")]
 ghost_mode: bool,
 },
 Kiro {
 auth_method: String,
 #[serde(skip_serializing_if = "Option::is_none")]
 client_id: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 client_secret: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 region: Option<String>,
 },
 GithubCopilot {
 #[serde(skip_serializing_if = "Option::is_none")]
 copilot_token: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 copilot_expires_at: Option<i64>,
 },
 /// Providers with no structured per-credential state beyond the common
 /// `Connection` fields (e.g. plain API-key providers).
 Other(serde_json::Value),
}

fn default_true() -> bool {
 true
}

impl Default for ProviderSpecificData {
 fn default() -> Self {
 ProviderSpecificData::Other(serde_json::Value::Null)
 }
}

/// Unix-millisecond instant. Kept as a plain `i64` (not `time::OffsetDateTime`)
/// since the core only ever compares it against `now_millis()`.
pub type InstantMillis = i64;

pub fn now_millis() -> InstantMillis {
 SystemTime::now()
 .duration_since(UNIX_EPOCH)
 .unwrap_or_default()
 .as_millis() as i64
}

/// One credential belonging to one upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
 pub id: ConnectionId,
 pub provider: Provider,
 pub auth_type: AuthType,
 /// Lower priority values are tried first.
 pub priority: i64,
 pub is_active: bool,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub api_key: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub access_token: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub refresh_token: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub expires_at: Option<InstantMillis>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub project_id: Option<String>,
 #[serde(default)]
 pub provider_specific_data: ProviderSpecificData,
 pub test_status: TestStatus,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub last_error: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub error_code: Option<i32>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub last_error_at: Option<InstantMillis>,
 /// Connection is "in cooldown" until this instant, exclusive. A
 /// connection whose `rate_limited_until` is in the past is effectively
 /// available: callers must re-check against `now_millis()`, not
 /// `is_active` alone.
 #[serde(skip_serializing_if = "Option::is_none")]
 pub rate_limited_until: Option<InstantMillis>,
 /// Strictly monotonically increases on consecutive rate-limit failures,
 /// capped at `BackoffConfig::max_level`.
 pub backoff_level: i32,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub last_used_at: Option<InstantMillis>,
 pub consecutive_use_count: i32,
}

impl Connection {
 pub fn is_rate_limited(&self, now: InstantMillis) -> bool {
 self.rate_limited_until.is_some_and(|until| until > now)
 }
}

/// Applies-or-leaves-alone for a scalar field, or explicitly clears a
/// nullable field. Used by [`crate::store::ConnectionPatch`] so that a
/// single atomic update can both set new values (refresh) and null out a
/// group of fields (clear-error) without conflating "untouched" with "unset".
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
 #[default]
 Unchanged,
 Clear,
 Set(T),
}

impl<T> Patch<T> {
 pub fn is_unchanged(&self) -> bool {
 matches!(self, Patch::Unchanged)
 }

 /// Applies this patch onto an existing `Option<T>` field.
 pub fn apply(self, field: &mut Option<T>) {
 match self {
 Patch::Unchanged => {}
 Patch::Clear => *field = None,
 Patch::Set(value) => *field = Some(value),
 }
 }
}

/// Static configuration per provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
 pub provider: Provider,
 /// Ordered fallback URLs; the base executor loop tries them in order.
 pub base_urls: Vec<String>,
 pub chat_path: String,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub refresh_url: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub client_id: Option<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub client_secret: Option<String>,
 #[serde(default)]
 pub default_headers: Vec<(String, String)>,
}

// `FallbackStrategy` and `Settings` live in
// `cgate-common` so both this crate and the CLI/DB config layer share one
// definition; re-exported here for callers that only know about the
// provider-core data model.
pub use cgate_common::{FallbackStrategy, Settings};

/// A named alias that fans one logical model out to an ordered list of
/// real `provider/model` targets, tried with fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combo {
 pub name: String,
 pub models: Vec<String>,
 #[serde(skip_serializing_if = "Option::is_none")]
 pub description: Option<String>,
}

/// One on-the-wire Cursor ConnectRPC frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorFrameFlags(pub u8);

impl CursorFrameFlags {
 pub const RAW: u8 = 0x00;
 pub const GZIP: u8 = 0x01;
 pub const ALT_GZIP: u8 = 0x02;
 pub const BOTH_GZIP: u8 = 0x03;

 pub fn maybe_compressed(&self) -> bool {
 self.0 & 0x03 != 0
 }
}

/// A single event out of a provider executor's normalised response stream;
/// the Normalised Response Assembler consumes this same stream whether it's
/// producing SSE chunks or one aggregated JSON object, factoring the decoder
/// as an iterator of events rather than a bespoke decode-loop per provider.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
 /// A fragment of assistant text.
 Text(String),
 /// A fragment of a tool call, identified by its upstream id.
 ToolCallDelta {
 id: String,
 name: Option<String>,
 arguments_fragment: String,
 is_last: bool,
 },
 /// The upstream surfaced a terminal error mid-stream.
 Error { message: String, is_rate_limit: bool },
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn provider_round_trips_through_display_and_fromstr() {
 for p in [
 Provider::Cursor,
 Provider::Claude,
 Provider::Codex,
 Provider::GeminiCli,
 Provider::Antigravity,
 Provider::GithubCopilot,
 Provider::Kiro,
 Provider::Qwen,
 Provider::IFlow,
 Provider::OpenAiCompatible,
 Provider::AnthropicCompatible,
 ] {
 let s = p.to_string();
 assert_eq!(s.parse::<Provider>().unwrap(), p);
 }
 }

 #[test]
 fn patch_clear_nulls_out_field() {
 let mut field = Some(42i32);
 Patch::Clear.apply(&mut field);
 assert_eq!(field, None);
 }

 #[test]
 fn patch_unchanged_leaves_field_alone() {
 let mut field = Some(42i32);
 Patch::<i32>::Unchanged.apply(&mut field);
 assert_eq!(field, Some(42));
 }

 #[test]
 fn connection_is_rate_limited_uses_exclusive_upper_bound() {
 let mut conn = sample_connection();
 conn.rate_limited_until = Some(1_000);
 assert!(conn.is_rate_limited(500));
 assert!(!conn.is_rate_limited(1_000));
 assert!(!conn.is_rate_limited(1_500));
 }

 fn sample_connection() -> Connection {
 Connection {
 id: ConnectionId(1),
 provider: Provider::Claude,
 auth_type: AuthType::OAuth,
 priority: 1,
 is_active: true,
 api_key: None,
 access_token: Some("tok".into()),
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
}

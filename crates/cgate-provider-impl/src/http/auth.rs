//! Per-provider auth header construction for the uniform HTTP executor.
//! Grounded on `providers/custom/mod.rs` header helpers
//! (`set_bearer`/`set_header`), narrowed to exactly what each provider's
//! credential shape needs.

use cgate_provider_core::{header_set, Connection, Headers, Provider, ProviderError, ProviderResult, ProviderSpecificData};

fn bearer(headers: &mut Headers, token: &str) {
 header_set(headers, "authorization", format!("Bearer {token}"));
}

fn oauth_token(connection: &Connection) -> ProviderResult<&str> {
 connection
 .access_token
 .as_deref()
 .ok_or(ProviderError::MissingCredentialField("accessToken"))
}

fn api_key(connection: &Connection) -> ProviderResult<&str> {
 connection.api_key.as_deref().ok_or(ProviderError::MissingCredentialField("apiKey"))
}

/// Applies the provider-specific authorization header for `provider`.
pub fn apply(provider: Provider, headers: &mut Headers, connection: &Connection) -> ProviderResult<()> {
 match provider {
 Provider::Cursor => unreachable!("cursor has its own executor"),
 Provider::GithubCopilot => {
 let token = match &connection.provider_specific_data {
 ProviderSpecificData::GithubCopilot { copilot_token: Some(token), .. } => token.as_str(),
 _ => oauth_token(connection)?,
 };
 bearer(headers, token);
 }
 Provider::OpenAiCompatible => bearer(headers, api_key(connection)?),
 Provider::AnthropicCompatible => {
 header_set(headers, "x-api-key", api_key(connection)?);
 header_set(headers, "anthropic-version", "2023-06-01");
 }
 Provider::Claude
 | Provider::Codex
 | Provider::GeminiCli
 | Provider::Antigravity
 | Provider::Kiro
 | Provider::Qwen
 | Provider::IFlow => bearer(headers, oauth_token(connection)?),
 }
 Ok(())
}

#[cfg(test)]
mod tests {
 use super::*;
 use cgate_provider_core::{AuthType, ConnectionId, TestStatus};

 fn sample(provider: Provider, data: ProviderSpecificData) -> Connection {
 Connection {
 id: ConnectionId(1),
 provider,
 auth_type: AuthType::OAuth,
 priority: 1,
 is_active: true,
 api_key: Some("key-123".into()),
 access_token: Some("access-123".into()),
 refresh_token: None,
 expires_at: None,
 project_id: None,
 provider_specific_data: data,
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

 #[test]
 fn github_prefers_copilot_token_over_access_token() {
 let conn = sample(
 Provider::GithubCopilot,
 ProviderSpecificData::GithubCopilot {
 copilot_token: Some("copilot-tok".into()),
 copilot_expires_at: None,
 },
 );
 let mut headers = Headers::new();
 apply(Provider::GithubCopilot, &mut headers, &conn).unwrap();
 assert_eq!(
 cgate_provider_core::header_get(&headers, "authorization"),
 Some("Bearer copilot-tok")
 );
 }

 #[test]
 fn anthropic_compatible_uses_api_key_header() {
 let conn = sample(Provider::AnthropicCompatible, ProviderSpecificData::default());
 let mut headers = Headers::new();
 apply(Provider::AnthropicCompatible, &mut headers, &conn).unwrap();
 assert_eq!(cgate_provider_core::header_get(&headers, "x-api-key"), Some("key-123"));
 }

 #[test]
 fn oauth_providers_use_bearer_access_token() {
 let conn = sample(Provider::Codex, ProviderSpecificData::default());
 let mut headers = Headers::new();
 apply(Provider::Codex, &mut headers, &conn).unwrap();
 assert_eq!(
 cgate_provider_core::header_get(&headers, "authorization"),
 Some("Bearer access-123")
 );
 }
}

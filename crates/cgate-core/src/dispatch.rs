//! The Dispatch Loop: resolves a wire model string to a provider/model pair
//! or a combo, then drives account selection, token refresh, and upstream
//! execution with provider-failover on classified errors. Grounded on a
//! conventional resolver -> pool -> provider chain, narrowed to this
//! gateway's single ingress shape and widened with combo fan-out.

use std::collections::HashMap;

use cgate_protocol::chat::CreateChatCompletionRequestBody;
use cgate_provider_core::{
 Arbiter, Connection, ConnectionId, CredentialStore, EventStream, Executor, ExecutorRequest,
 Provider, ProviderConfig, ProviderRegistry, SelectOutcome,
};
use cgate_storage::{ComboStore, Store};
use tracing::warn;

use crate::error::ApiError;

/// Linear-backoff refresh attempts ("bounded at 3").
const MAX_REFRESH_RETRIES: u32 = 3;

pub struct DispatchSuccess {
 pub connection: Connection,
 pub events: EventStream,
}

/// Splits a `provider/model` wire model string. Anything without a `/`, or
/// whose provider segment isn't one of the known tags, isn't a direct
/// provider/model pair and falls through to combo resolution instead.
pub fn split_provider_model(model: &str) -> Option<(Provider, String)> {
 let (provider, rest) = model.split_once('/')?;
 let provider: Provider = provider.parse().ok()?;
 if rest.is_empty() {
 return None;
 }
 Some((provider, rest.to_string()))
}

pub async fn handle_chat(
 store: &Store,
 arbiter: &Arbiter<Store>,
 registry: &ProviderRegistry,
 provider_configs: &HashMap<Provider, ProviderConfig>,
 body: CreateChatCompletionRequestBody,
) -> Result<DispatchSuccess, ApiError> {
 if body.model.trim().is_empty() {
 return Err(ApiError::input_error("model is required"));
 }

 if let Some((provider, model)) = split_provider_model(&body.model) {
 return handle_single_model_chat(
 store,
 arbiter,
 registry,
 provider_configs,
 provider,
 &model,
 &body,
 )
 .await;
 }

 let combo = store
 .get_combo(&body.model)
 .await
 .map_err(ApiError::from)?
 .ok_or_else(|| ApiError::input_error(format!("unknown model or combo: {}", body.model)))?;

 handle_combo_chat(store, arbiter, registry, provider_configs, &combo.models, &body).await
}

async fn handle_combo_chat(
 store: &Store,
 arbiter: &Arbiter<Store>,
 registry: &ProviderRegistry,
 provider_configs: &HashMap<Provider, ProviderConfig>,
 models: &[String],
 body: &CreateChatCompletionRequestBody,
) -> Result<DispatchSuccess, ApiError> {
 let mut earliest_retry_after_ms: Option<i64> = None;

 for model in models {
 let Some((provider, model_name)) = split_provider_model(model) else {
 warn!(event = "combo_entry_unresolvable", model = %model);
 continue;
 };

 match handle_single_model_chat(
 store,
 arbiter,
 registry,
 provider_configs,
 provider,
 &model_name,
 body,
 )
 .await
 {
 Ok(success) => return Ok(success),
 Err(err) if err.kind == crate::error::ApiErrorKind::AllAccountsUnavailable => {
 let candidate = err.retry_after_ms.unwrap_or(0);
 earliest_retry_after_ms = Some(match earliest_retry_after_ms {
 Some(current) => current.min(candidate),
 None => candidate,
 });
 }
 Err(err) if err.kind == crate::error::ApiErrorKind::UpstreamError => {
 // classify() already decided this wasn't worth falling back
 // on when the loop inside handle_single_model_chat gave up,
 // so surface it immediately rather than trying the rest of
 // the combo.
 return Err(err);
 }
 Err(_) => continue,
 }
 }

 match earliest_retry_after_ms {
 Some(ms) => Err(ApiError::all_accounts_unavailable(
 "every model in the combo is currently rate limited",
 ms,
 )),
 None => Err(ApiError::combo_exhausted(
 "no model in the combo produced a usable response",
 )),
 }
}

async fn handle_single_model_chat(
 store: &Store,
 arbiter: &Arbiter<Store>,
 registry: &ProviderRegistry,
 provider_configs: &HashMap<Provider, ProviderConfig>,
 provider: Provider,
 model: &str,
 body: &CreateChatCompletionRequestBody,
) -> Result<DispatchSuccess, ApiError> {
 let config = provider_configs.get(&provider).ok_or_else(|| {
 ApiError::no_credentials(format!("no configuration for provider {provider}"))
 })?;
 let executor = registry.get(provider).ok_or_else(|| {
 ApiError::no_credentials(format!("no executor registered for provider {provider}"))
 })?;

 let settings = arbiter.settings().await.map_err(ApiError::from)?;
 let mut exclude_connection_id: Option<ConnectionId> = None;

 loop {
 let connection = match arbiter.select(provider, exclude_connection_id).await.map_err(ApiError::from)? {
 SelectOutcome::Selected(connection) => connection,
 SelectOutcome::AllRateLimited { retry_after_ms, last_error, .. } => {
 return Err(ApiError::all_accounts_unavailable(
 last_error.unwrap_or_else(|| format!("all {provider} accounts are rate limited")),
 retry_after_ms,
 ));
 }
 SelectOutcome::NoConnections => {
 return Err(ApiError::no_credentials(format!(
 "no connections configured for provider {provider}"
 )));
 }
 };

 let connection = refresh_if_stale(
 store,
 executor.as_ref(),
 connection,
 settings.token_expiry_buffer_ms,
 )
 .await?;

 let request = ExecutorRequest {
 model: model.to_string(),
 body,
 stream: body.is_streaming(),
 connection: &connection,
 config,
 };

 match executor.execute(request).await {
 Ok(events) => {
 arbiter.clear_account_error(&connection).await.map_err(ApiError::from)?;
 return Ok(DispatchSuccess { connection, events });
 }
 Err(failure) => {
 let outcome = arbiter
 .mark_account_unavailable(connection.id, failure.status(), failure.body_text())
 .await
 .map_err(ApiError::from)?;

 if !outcome.should_fallback {
 return Err(ApiError::upstream_error(
 status_from_u16(failure.status()),
 failure.body_text().to_string(),
 ));
 }

 exclude_connection_id = Some(connection.id);
 }
 }
 }
}

async fn refresh_if_stale(
 store: &Store,
 executor: &dyn Executor,
 connection: Connection,
 buffer_ms: i64,
) -> Result<Connection, ApiError> {
 if !cgate_provider_core::needs_refresh(&connection, cgate_provider_core::now_millis(), buffer_ms) {
 return Ok(connection);
 }

 let refreshed = cgate_provider_core::refresh_with_retry(MAX_REFRESH_RETRIES, || {
 executor.refresh_credentials(&connection)
 })
 .await;

 let Some(tokens) = refreshed else {
 // A failed refresh proceeds with the existing
 // (possibly stale) token rather than failing the request outright.
 warn!(event = "token_refresh_exhausted", connection_id = connection.id.0);
 return Ok(connection);
 };

 let patch = cgate_provider_core::ConnectionPatch {
 access_token: cgate_provider_core::Patch::Set(tokens.access_token),
 refresh_token: tokens
 .refresh_token
 .map(cgate_provider_core::Patch::Set)
 .unwrap_or(cgate_provider_core::Patch::Unchanged),
 expires_at: cgate_provider_core::Patch::Set(
 cgate_provider_core::now_millis() + tokens.expires_in_secs * 1000,
 ),
 test_status: Some(cgate_provider_core::TestStatus::Active),
 ..Default::default()
 };
 store.update_connection(connection.id, patch).await.map_err(ApiError::from)
}

fn status_from_u16(status: u16) -> axum::http::StatusCode {
 axum::http::StatusCode::from_u16(status).unwrap_or(axum::http::StatusCode::BAD_GATEWAY)
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn splits_provider_and_model() {
 assert_eq!(
 split_provider_model("claude/claude-sonnet-4"),
 Some((Provider::Claude, "claude-sonnet-4".to_string()))
 );
 }

 #[test]
 fn rejects_unknown_provider_tag() {
 assert_eq!(split_provider_model("not-a-provider/model"), None);
 }

 #[test]
 fn rejects_missing_model_segment() {
 assert_eq!(split_provider_model("claude/"), None);
 }

 #[test]
 fn bare_combo_name_has_no_slash() {
 assert_eq!(split_provider_model("my-combo"), None);
 }
}

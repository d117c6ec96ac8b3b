//! Wires every known [`Provider`] to its [`Executor`], following the static
//! registration point the executor contract calls for. Cursor gets its own
//! codec; everything else shares [`UniformHttpExecutor`] paired with the
//! [`TokenRefresher`] the per-provider refresh table calls for.

use std::collections::HashMap;
use std::sync::Arc;

use cgate_provider_core::{Provider, ProviderConfig, ProviderRegistry, TokenRefresher};

use crate::cursor::CursorExecutor;
use crate::http::UniformHttpExecutor;
use crate::refresh::{ClaudeRefresher, GithubRefresher, KiroRefresher, OAuthFormRefresher};

const COPILOT_TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";
const CODEX_SCOPE: &str = "openid profile email offline_access";

fn refresher_for(provider: Provider, config: Option<&ProviderConfig>) -> Option<Arc<dyn TokenRefresher>> {
    let config = config?;
    let refresh_url = config.refresh_url.clone()?;
    let client_id = config.client_id.clone().unwrap_or_default();
    let client_secret = config.client_secret.clone();

    let refresher: Arc<dyn TokenRefresher> = match provider {
        Provider::Cursor | Provider::OpenAiCompatible | Provider::AnthropicCompatible => return None,
        Provider::Claude => Arc::new(ClaudeRefresher { refresh_url, client_id }),
        Provider::Codex => Arc::new(OAuthFormRefresher {
            refresh_url,
            client_id,
            client_secret,
            scope: Some(CODEX_SCOPE.to_string()),
            basic_auth: false,
        }),
        Provider::GeminiCli | Provider::Antigravity | Provider::Qwen => Arc::new(OAuthFormRefresher {
            refresh_url,
            client_id,
            client_secret,
            scope: None,
            basic_auth: false,
        }),
        Provider::IFlow => Arc::new(OAuthFormRefresher {
            refresh_url,
            client_id,
            client_secret,
            scope: None,
            basic_auth: true,
        }),
        Provider::GithubCopilot => Arc::new(GithubRefresher {
            refresh_url,
            client_id,
            client_secret: client_secret.unwrap_or_default(),
            copilot_token_url: COPILOT_TOKEN_URL.to_string(),
        }),
        Provider::Kiro => Arc::new(KiroRefresher { social_auth_refresh_url: refresh_url }),
    };
    Some(refresher)
}

/// Builds the full executor registry from the configured `ProviderConfig`
/// for each provider in use. A provider with no entry in `configs` still
/// gets an executor (so routing doesn't panic), just one that will fail at
/// `build_url`/`build_headers` time with a clear `InvalidConfig` error.
pub fn build_registry(configs: &HashMap<Provider, ProviderConfig>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(CursorExecutor::new()));

    let other_providers = [
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
    ];
    for provider in other_providers {
        let refresher = refresher_for(provider, configs.get(&provider));
        registry.register(Arc::new(UniformHttpExecutor::new(provider, refresher)));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_known_provider() {
        let registry = build_registry(&HashMap::new());
        for provider in [
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
            assert!(registry.get(provider).is_some(), "missing executor for {provider:?}");
        }
    }

    #[test]
    fn no_config_means_no_refresher() {
        assert!(refresher_for(Provider::Claude, None).is_none());
    }
}

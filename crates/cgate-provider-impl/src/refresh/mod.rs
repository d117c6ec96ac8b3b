//! Per-provider `TokenRefresher` implementations. Each refresher below
//! follows the externally-visible contract laid out for the Token
//! Refresher, built with the crate's own `shared_client`/header idiom.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use cgate_provider_core::{Connection, ProviderSpecificData, RefreshedTokens, TokenRefresher};

use crate::client::shared_client;

/// `{accessToken, refreshToken?, expiresIn}`, tolerating either casing
/// since providers vary ("field names normalised").
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(alias = "access_token")]
    access_token: String,
    #[serde(alias = "refresh_token", default)]
    refresh_token: Option<String>,
    #[serde(alias = "expires_in", default)]
    expires_in: Option<i64>,
}

impl From<TokenResponse> for RefreshedTokens {
    fn from(response: TokenResponse) -> Self {
        RefreshedTokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in_secs: response.expires_in.unwrap_or(0),
        }
    }
}

async fn post_json(url: &str, body: serde_json::Value) -> Option<RefreshedTokens> {
    let response = shared_client().post(url).json(&body).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.json::<TokenResponse>().await.ok().map(Into::into)
}

async fn post_form(
    url: &str,
    form: &[(&str, String)],
    basic_auth: Option<(&str, &str)>,
) -> Option<RefreshedTokens> {
    let mut builder = shared_client().post(url).form(form);
    if let Some((user, pass)) = basic_auth {
        let encoded = STANDARD.encode(format!("{user}:{pass}"));
        builder = builder.header("authorization", format!("Basic {encoded}"));
    }
    let response = builder.send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.json::<TokenResponse>().await.ok().map(Into::into)
}

/// claude: JSON `{grant_type, refresh_token, client_id}`.
pub struct ClaudeRefresher {
    pub refresh_url: String,
    pub client_id: String,
}

#[async_trait]
impl TokenRefresher for ClaudeRefresher {
    async fn refresh(&self, conn: &Connection) -> Option<RefreshedTokens> {
        let refresh_token = conn.refresh_token.clone()?;
        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "client_id": self.client_id,
        });
        post_json(&self.refresh_url, body).await
    }
}

/// Shared shape for codex / gemini-cli / antigravity / qwen / iflow: a
/// form-encoded refresh-token grant, optionally over HTTP Basic auth
/// (iflow) instead of a `client_secret` form field.
pub struct OAuthFormRefresher {
    pub refresh_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub basic_auth: bool,
}

#[async_trait]
impl TokenRefresher for OAuthFormRefresher {
    async fn refresh(&self, conn: &Connection) -> Option<RefreshedTokens> {
        let refresh_token = conn.refresh_token.clone()?;
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.clone()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.clone()));
        }
        let basic_auth = if self.basic_auth {
            self.client_secret.as_deref().map(|secret| (self.client_id.as_str(), secret))
        } else {
            if let Some(secret) = &self.client_secret {
                form.push(("client_secret", secret.clone()));
            }
            None
        };
        post_form(&self.refresh_url, &form, basic_auth).await
    }
}

#[derive(Debug, Deserialize)]
struct CopilotTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// github: a form refresh-token grant, then a secondary exchange of the
/// resulting GitHub access token for a Copilot API token. The refresher
/// contract has no side channel for persisting the intermediate GitHub
/// token separately from the Copilot one, so the Copilot token is what
/// comes back as `access_token` — it's what every subsequent request
/// actually authenticates with.
pub struct GithubRefresher {
    pub refresh_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub copilot_token_url: String,
}

#[async_trait]
impl TokenRefresher for GithubRefresher {
    async fn refresh(&self, conn: &Connection) -> Option<RefreshedTokens> {
        let refresh_token = conn.refresh_token.clone()?;
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
        ];
        let github_tokens = post_form(&self.refresh_url, &form, None).await?;

        let response = shared_client()
            .get(&self.copilot_token_url)
            .header("authorization", format!("token {}", github_tokens.access_token))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let copilot = response.json::<CopilotTokenResponse>().await.ok()?;
        let expires_in_secs = copilot
            .expires_at
            .map(|at| (at - cgate_provider_core::now_millis() / 1000).max(0))
            .unwrap_or(0);

        Some(RefreshedTokens {
            access_token: copilot.token,
            refresh_token: github_tokens.refresh_token,
            expires_in_secs,
        })
    }
}

/// kiro: JSON. AWS SSO OIDC when the connection carries its own
/// `clientId`/`clientSecret`, else a social-auth refresh URL with
/// camelCase response fields (already what [`TokenResponse`] expects).
pub struct KiroRefresher {
    pub social_auth_refresh_url: String,
}

#[async_trait]
impl TokenRefresher for KiroRefresher {
    async fn refresh(&self, conn: &Connection) -> Option<RefreshedTokens> {
        let refresh_token = conn.refresh_token.clone()?;
        if let ProviderSpecificData::Kiro {
            client_id: Some(client_id),
            client_secret: Some(client_secret),
            region,
            ..
        } = &conn.provider_specific_data
        {
            let region = region.as_deref().unwrap_or("us-east-1");
            let url = format!("https://oidc.{region}.amazonaws.com/token");
            let body = serde_json::json!({
                "grantType": "refresh_token",
                "refreshToken": refresh_token,
                "clientId": client_id,
                "clientSecret": client_secret,
            });
            return post_json(&url, body).await;
        }
        let body = serde_json::json!({ "refreshToken": refresh_token });
        post_json(&self.social_auth_refresh_url, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_accepts_camel_or_snake_case() {
        let camel: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r","expiresIn":3600}"#).unwrap();
        assert_eq!(camel.access_token, "a");
        assert_eq!(camel.expires_in, Some(3600));

        let snake: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a2","expires_in":60}"#).unwrap();
        assert_eq!(snake.access_token, "a2");
        assert_eq!(snake.expires_in, Some(60));
    }
}

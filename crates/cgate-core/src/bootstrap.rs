//! Process wiring: CLI/env parsing, the CLI > ENV > DB global config merge
//! (`GlobalConfig`), and assembly of the `Core` the binary serves. Grounded
//! on a conventional CLI-driven bootstrap shape, widened with the
//! merge-then-persist-back step this gateway needs.

use std::collections::HashMap;
use std::sync::Arc;

use cgate_common::{GlobalConfig, GlobalConfigPatch};
use cgate_provider_core::{Arbiter, Provider, ProviderConfig};
use cgate_storage::{ConfigStore, MemoryStore, SeaOrmStore, Store};
use clap::Parser;

use crate::auth::{AuthProvider, NoopAuth};
use crate::core::Core;

#[derive(Parser, Debug)]
#[command(name = "cgate", about = "Multi-provider AI chat-completion gateway")]
pub struct CliArgs {
 /// Database DSN. Required unless --memory-store is set.
 #[arg(long, env = "CGATE_DSN")]
 pub dsn: Option<String>,
 #[arg(long, env = "CGATE_HOST")]
 pub host: Option<String>,
 #[arg(long, env = "CGATE_PORT")]
 pub port: Option<u16>,
 /// Plaintext admin key; hashed before it's persisted to `GlobalConfig`.
 #[arg(long, env = "CGATE_ADMIN_KEY")]
 pub admin_key: Option<String>,
 #[arg(long, env = "CGATE_PROXY")]
 pub proxy: Option<String>,
 /// Run against the in-memory store instead of a SQLite-backed one.
 /// The Credential Store collaborator admits more than one backend; this
 /// flag is how an operator picks at startup.
 #[arg(long, env = "CGATE_MEMORY_STORE")]
 pub memory_store: bool,
}

pub fn hash_admin_key(key: &str) -> String {
 blake3::hash(key.as_bytes()).to_hex().to_string()
}

/// Overlay order is CLI/ENV (already merged by clap's own env fallback)
/// over whatever was previously persisted to the Credential Store.
pub fn merge_global_config(
 args: &CliArgs,
 from_db: Option<GlobalConfig>,
) -> Result<GlobalConfig, cgate_common::GlobalConfigError> {
 let mut patch = from_db.map(GlobalConfigPatch::from).unwrap_or_default();
 let dsn = args
 .dsn
 .clone()
 .or_else(|| args.memory_store.then(|| "memory".to_string()));
 patch.overlay(GlobalConfigPatch {
 host: args.host.clone(),
 port: args.port,
 admin_key_hash: args.admin_key.as_deref().map(hash_admin_key),
 proxy: args.proxy.clone(),
 dsn,
 ..Default::default()
 });
 patch.into_config()
}

/// Well-known base URLs, chat paths, and OAuth refresh endpoints per
/// provider. No admin-CRUD surface exists for `ProviderConfig` in this
/// architecture, so these are the operator-overridable defaults a fresh
/// deployment starts from; client ids here are the providers' own public
/// desktop-app ids, not secrets.
pub fn default_provider_configs() -> HashMap<Provider, ProviderConfig> {
 let mut configs = HashMap::new();
 configs.insert(
 Provider::Claude,
 ProviderConfig {
 provider: Provider::Claude,
 base_urls: vec!["https://api.anthropic.com".to_string()],
 chat_path: "/v1/messages".to_string(),
 refresh_url: Some("https://console.anthropic.com/v1/oauth/token".to_string()),
 client_id: Some("9d1c250a-e61b-44d9-88ed-5944d1962f5e".to_string()),
 client_secret: None,
 default_headers: vec![("anthropic-version".to_string(), "2023-06-01".to_string())],
 },
 );
 configs.insert(
 Provider::Codex,
 ProviderConfig {
 provider: Provider::Codex,
 base_urls: vec!["https://chatgpt.com/backend-api/codex".to_string()],
 chat_path: "/responses".to_string(),
 refresh_url: Some("https://auth.openai.com/oauth/token".to_string()),
 client_id: Some("app_EMoamEEZ73f0CkXaXp7hrann".to_string()),
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::GeminiCli,
 ProviderConfig {
 provider: Provider::GeminiCli,
 base_urls: vec!["https://cloudcode-pa.googleapis.com".to_string()],
 chat_path: "/v1internal:streamGenerateContent".to_string(),
 refresh_url: Some("https://oauth2.googleapis.com/token".to_string()),
 client_id: Some("681255809395-oo8ft2oprdrnp9e3aqf6av3hmdib135j.apps.googleusercontent.com".to_string()),
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::Antigravity,
 ProviderConfig {
 provider: Provider::Antigravity,
 base_urls: vec!["https://cloudcode-pa.googleapis.com".to_string()],
 chat_path: "/v1internal:streamGenerateContent".to_string(),
 refresh_url: Some("https://oauth2.googleapis.com/token".to_string()),
 client_id: Some("681255809395-oo8ft2oprdrnp9e3aqf6av3hmdib135j.apps.googleusercontent.com".to_string()),
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::GithubCopilot,
 ProviderConfig {
 provider: Provider::GithubCopilot,
 base_urls: vec!["https://api.githubcopilot.com".to_string()],
 chat_path: "/chat/completions".to_string(),
 refresh_url: Some("https://github.com/login/oauth/access_token".to_string()),
 client_id: Some("Iv1.b507a08c87ecfe98".to_string()),
 client_secret: None,
 default_headers: vec![("copilot-integration-id".to_string(), "vscode-chat".to_string())],
 },
 );
 configs.insert(
 Provider::Kiro,
 ProviderConfig {
 provider: Provider::Kiro,
 base_urls: vec!["https://codewhisperer.us-east-1.amazonaws.com".to_string()],
 chat_path: "/generateAssistantResponse".to_string(),
 refresh_url: Some("https://prod.us-east-1.auth.desktop.kiro.dev/refreshToken".to_string()),
 client_id: None,
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::Qwen,
 ProviderConfig {
 provider: Provider::Qwen,
 base_urls: vec!["https://dashscope.aliyuncs.com/compatible-mode".to_string()],
 chat_path: "/v1/chat/completions".to_string(),
 refresh_url: Some("https://chat.qwen.ai/api/v1/oauth2/token".to_string()),
 client_id: Some("f0304373b74a44d2b584a3fb70ca9e56".to_string()),
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::IFlow,
 ProviderConfig {
 provider: Provider::IFlow,
 base_urls: vec!["https://apis.iflow.cn".to_string()],
 chat_path: "/v1/chat/completions".to_string(),
 refresh_url: Some("https://iflow.cn/oauth/token".to_string()),
 client_id: Some("10009311001".to_string()),
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::OpenAiCompatible,
 ProviderConfig {
 provider: Provider::OpenAiCompatible,
 base_urls: vec!["https://api.openai.com".to_string()],
 chat_path: "/v1/chat/completions".to_string(),
 refresh_url: None,
 client_id: None,
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs.insert(
 Provider::AnthropicCompatible,
 ProviderConfig {
 provider: Provider::AnthropicCompatible,
 base_urls: vec!["https://api.anthropic.com".to_string()],
 chat_path: "/v1/messages".to_string(),
 refresh_url: None,
 client_id: None,
 client_secret: None,
 default_headers: vec![("anthropic-version".to_string(), "2023-06-01".to_string())],
 },
 );
 configs.insert(
 Provider::Cursor,
 ProviderConfig {
 provider: Provider::Cursor,
 base_urls: vec!["https://api2.cursor.sh".to_string()],
 chat_path: "/aiserver.v1.ChatService/StreamUnifiedChatWithTools".to_string(),
 refresh_url: None,
 client_id: None,
 client_secret: None,
 default_headers: vec![],
 },
 );
 configs
}

pub struct Bootstrapped {
 pub core: Core,
 pub config: GlobalConfig,
}

pub async fn bootstrap() -> anyhow::Result<Bootstrapped> {
 let args = CliArgs::parse();
 bootstrap_with_args(args).await
}

pub async fn bootstrap_with_args(args: CliArgs) -> anyhow::Result<Bootstrapped> {
 let store = build_store(&args).await?;
 let existing = store.load_global_config().await?;
 let config = merge_global_config(&args, existing)?;
 store.upsert_global_config(&config).await?;

 let store = Arc::new(store);
 let arbiter = Arc::new(Arbiter::new(store.clone()).with_classifier_config(Default::default()));
 let provider_configs = default_provider_configs();
 let registry = Arc::new(cgate_provider_impl::build_registry(&provider_configs));
 let auth: Arc<dyn AuthProvider> = Arc::new(NoopAuth);

 let core = Core::new(store, arbiter, registry, provider_configs, auth);
 Ok(Bootstrapped { core, config })
}

async fn build_store(args: &CliArgs) -> anyhow::Result<Store> {
 if args.memory_store {
 return Ok(Store::Memory(MemoryStore::new()));
 }
 let dsn = args
 .dsn
 .clone()
 .ok_or_else(|| anyhow::anyhow!("--dsn (or CGATE_DSN) is required unless --memory-store is set"))?;
 let store = SeaOrmStore::connect(&dsn).await?;
 store.sync_schema().await?;
 Ok(Store::SeaOrm(store))
}

#[cfg(test)]
mod tests {
 use super::*;

 fn args(memory_store: bool, admin_key: Option<&str>) -> CliArgs {
 CliArgs {
 dsn: None,
 host: None,
 port: None,
 admin_key: admin_key.map(|s| s.to_string()),
 proxy: None,
 memory_store,
 }
 }

 #[test]
 fn merge_requires_admin_key_on_first_boot() {
 let err = merge_global_config(&args(true, None), None).unwrap_err();
 assert!(matches!(err, cgate_common::GlobalConfigError::MissingField("admin_key_hash")));
 }

 #[test]
 fn memory_store_gets_a_placeholder_dsn() {
 let config = merge_global_config(&args(true, Some("secret")), None).unwrap();
 assert_eq!(config.dsn, "memory");
 assert_ne!(config.admin_key_hash, "secret");
 }

 #[test]
 fn cli_overrides_persisted_db_config() {
 let persisted = GlobalConfig {
 host: "0.0.0.0".to_string(),
 port: 8787,
 admin_key_hash: hash_admin_key("old"),
 proxy: None,
 dsn: "sqlite://old.db".to_string(),
 fallback_strategy: cgate_common::FallbackStrategy::FillFirst,
 sticky_round_robin_limit: 3,
 token_expiry_buffer_ms: 300_000,
 };
 let merged = merge_global_config(&args(false, Some("new")), Some(persisted)).unwrap();
 assert_eq!(merged.admin_key_hash, hash_admin_key("new"));
 assert_eq!(merged.dsn, "sqlite://old.db");
 }

 #[test]
 fn every_provider_has_a_default_config() {
 let configs = default_provider_configs();
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
 assert!(configs.contains_key(&provider), "missing config for {provider:?}");
 }
 }
}

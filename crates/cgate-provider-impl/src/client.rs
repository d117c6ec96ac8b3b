//! A process-wide shared `wreq` client, built once and reused by every
//! executor. Grounded on `providers/http_client.rs` cache,
//! narrowed to a single client since `ProviderConfig` has no per-connection
//! proxy setting to key a cache by.

use std::sync::OnceLock;

static CLIENT: OnceLock<wreq::Client> = OnceLock::new();

/// "Transport MUST use HTTP/2 when available; fall back to HTTP/1.1" is
/// `wreq`'s default ALPN negotiation behaviour, so every caller (Cursor's
/// codec included) just shares this one pooled client.
pub fn shared_client() -> wreq::Client {
 CLIENT
 .get_or_init(|| wreq::Client::builder().build().expect("default client config is valid"))
 .clone()
}

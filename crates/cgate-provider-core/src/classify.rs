//! The Error Classifier (C1): a pure, deterministic mapping from an
//! upstream failure to a fallback decision and cooldown. Grounded on a
//! status-code driven cooldown selector, extended with the message-text
//! patterns and full status table the gateway's fallback policy requires.

use serde::{Deserialize, Serialize};

/// Tunable cooldown durations and backoff parameters. All six cooldown
/// constants plus `{base, max, max_level}` are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
 pub not_found_cooldown_ms: i64,
 pub request_not_allowed_cooldown_ms: i64,
 pub unauthorized_cooldown_ms: i64,
 pub payment_required_cooldown_ms: i64,
 pub transient_cooldown_ms: i64,
 /// `base` in `cooldown(n) = min(base * 2^n, max)`.
 pub backoff_base_ms: i64,
 pub backoff_max_ms: i64,
 pub backoff_max_level: i32,
}

impl Default for ClassifierConfig {
 fn default() -> Self {
 Self {
 not_found_cooldown_ms: 60_000,
 request_not_allowed_cooldown_ms: 60_000,
 unauthorized_cooldown_ms: 10 * 60_000,
 payment_required_cooldown_ms: 60 * 60_000,
 transient_cooldown_ms: 10_000,
 backoff_base_ms: 1_000,
 backoff_max_ms: 5 * 60_000,
 backoff_max_level: 8,
 }
 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyDecision {
 pub should_fallback: bool,
 pub cooldown_ms: i64,
 pub new_backoff_level: Option<i32>,
}

fn exponential_backoff(config: &ClassifierConfig, backoff_level: i32) -> (i64, i32) {
 let shift = backoff_level.max(0).min(62) as u32;
 let cooldown = (config.backoff_base_ms.saturating_mul(1i64 << shift)).min(config.backoff_max_ms);
 let new_level = (backoff_level + 1).min(config.backoff_max_level);
 (cooldown, new_level)
}

/// Pure function `classify(status, bodyText, backoffLevel) -> decision`.
/// The FIRST matching rule in the decision order wins; message-text
/// patterns take priority over status codes. Never panics.
pub fn classify(
 config: &ClassifierConfig,
 status: u16,
 body_text: &str,
 backoff_level: i32,
) -> ClassifyDecision {
 let lower = body_text.to_ascii_lowercase();

 if lower.contains("no credentials") {
 return ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.not_found_cooldown_ms,
 new_backoff_level: None,
 };
 }
 if lower.contains("request not allowed") {
 return ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.request_not_allowed_cooldown_ms,
 new_backoff_level: None,
 };
 }
 const RATE_LIMIT_PATTERNS: [&str; 5] = [
 "rate limit",
 "too many requests",
 "quota exceeded",
 "capacity",
 "overloaded",
 ];
 if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
 let (cooldown_ms, new_backoff_level) = exponential_backoff(config, backoff_level);
 return ClassifyDecision {
 should_fallback: true,
 cooldown_ms,
 new_backoff_level: Some(new_backoff_level),
 };
 }

 match status {
 401 => ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.unauthorized_cooldown_ms,
 new_backoff_level: None,
 },
 402 | 403 => ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.payment_required_cooldown_ms,
 new_backoff_level: None,
 },
 404 => ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.not_found_cooldown_ms,
 new_backoff_level: None,
 },
 429 => {
 let (cooldown_ms, new_backoff_level) = exponential_backoff(config, backoff_level);
 ClassifyDecision {
 should_fallback: true,
 cooldown_ms,
 new_backoff_level: Some(new_backoff_level),
 }
 }
 406 | 408 | 500 | 502 | 503 | 504 => ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.transient_cooldown_ms,
 new_backoff_level: None,
 },
 _ => ClassifyDecision {
 should_fallback: true,
 cooldown_ms: config.transient_cooldown_ms,
 new_backoff_level: None,
 },
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 fn cfg() -> ClassifierConfig {
 ClassifierConfig::default()
 }

 #[test]
 fn message_pattern_wins_over_status_code() {
 // A 200 with a rate-limit message in the body still classifies as rate limit.
 let decision = classify(&cfg(), 200, "Rate limit exceeded, try later", 0);
 assert!(decision.should_fallback);
 assert_eq!(decision.new_backoff_level, Some(1));
 }

 #[test]
 fn exponential_backoff_doubles_and_caps() {
 let config = cfg();
 let d0 = classify(&config, 429, "", 0);
 assert_eq!(d0.cooldown_ms, config.backoff_base_ms);
 assert_eq!(d0.new_backoff_level, Some(1));

 let d1 = classify(&config, 429, "", 1);
 assert_eq!(d1.cooldown_ms, config.backoff_base_ms * 2);
 assert_eq!(d1.new_backoff_level, Some(2));

 let far = classify(&config, 429, "", 30);
 assert_eq!(far.cooldown_ms, config.backoff_max_ms);
 assert_eq!(far.new_backoff_level, Some(config.backoff_max_level));
 }

 #[test]
 fn no_credentials_message_ignores_status() {
 let decision = classify(&cfg(), 500, "No credentials available", 3);
 assert_eq!(decision.cooldown_ms, cfg().not_found_cooldown_ms);
 assert_eq!(decision.new_backoff_level, None);
 }

 #[test]
 fn unauthorized_status_maps_to_unauthorized_cooldown() {
 let decision = classify(&cfg(), 401, "invalid token", 0);
 assert_eq!(decision.cooldown_ms, cfg().unauthorized_cooldown_ms);
 }

 #[test]
 fn unknown_status_falls_back_conservatively() {
 let decision = classify(&cfg(), 999, "mystery", 0);
 assert!(decision.should_fallback);
 assert_eq!(decision.cooldown_ms, cfg().transient_cooldown_ms);
 }

 #[test]
 fn classifier_never_panics_on_empty_body() {
 for status in [200u16, 401, 404, 429, 500, 0] {
 let _ = classify(&cfg(), status, "", 0);
 }
 }
}

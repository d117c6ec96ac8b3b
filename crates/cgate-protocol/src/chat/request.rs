use serde::{Deserialize, Serialize};

use crate::chat::types::{
    ChatCompletionRequestMessage, ChatCompletionToolChoiceOption, ChatCompletionToolDefinition,
    ReasoningEffort,
};

/// Body of `POST /v1/chat/completions`. Must contain at least `model`; every
/// other field is optional and forwarded to the provider executor on a
/// best-effort basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateChatCompletionRequestBody {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatCompletionRequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatCompletionToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ChatCompletionToolChoiceOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Range is 0..=2.0; generally avoid setting both temperature and top_p (not enforced here).
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Deprecated; total prompt tokens plus `max_tokens` must fit the model context (not enforced here).
    pub max_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl CreateChatCompletionRequestBody {
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// Up to 4 stop sequences are allowed, but this limit is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopConfiguration {
    Single(String),
    Many(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_body_only_needs_model() {
        let body: CreateChatCompletionRequestBody =
            serde_json::from_str(r#"{"model":"gpt-4o-mini"}"#).unwrap();
        assert_eq!(body.model, "gpt-4o-mini");
        assert!(body.messages.is_empty());
        assert!(!body.is_streaming());
    }

    #[test]
    fn stop_configuration_accepts_single_or_many() {
        let single: StopConfiguration = serde_json::from_str(r#""END""#).unwrap();
        assert_eq!(single, StopConfiguration::Single("END".into()));
        let many: StopConfiguration = serde_json::from_str(r#"["A","B"]"#).unwrap();
        assert_eq!(many, StopConfiguration::Many(vec!["A".into(), "B".into()]));
    }
}

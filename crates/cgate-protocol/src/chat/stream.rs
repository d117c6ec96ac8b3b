use serde::{Deserialize, Serialize};

use crate::chat::types::{ChatCompletionFinishReason, ChatCompletionStreamResponseDelta, CompletionUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatCompletionChunkObjectType {
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatCompletionStreamChoice {
    pub index: i64,
    pub delta: ChatCompletionStreamResponseDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<ChatCompletionFinishReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateChatCompletionStreamResponse {
    pub id: String,
    pub object: ChatCompletionChunkObjectType,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionStreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::ChatCompletionStreamResponseDelta;

    #[test]
    fn stream_chunk_round_trips() {
        let chunk = CreateChatCompletionStreamResponse {
            id: "chatcmpl-1".into(),
            object: ChatCompletionChunkObjectType::ChatCompletionChunk,
            created: 0,
            model: "gpt-4o-mini".into(),
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta: ChatCompletionStreamResponseDelta {
                    role: None,
                    content: Some("hi".into()),
                    tool_calls: None,
                },
                finish_reason: None,
            }],
            usage: None,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: CreateChatCompletionStreamResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.choices[0].delta.content.as_deref(), Some("hi"));
    }
}

//! OpenAI-compatible chat-completion wire types: the only ingress shape
//! this gateway accepts (see crate root docs).

mod request;
mod response;
mod stream;
mod types;

pub use crate::sse::STREAM_DONE_MARKER;
pub use request::{CreateChatCompletionRequestBody, StopConfiguration};
pub use response::{ChatCompletionChoice, ChatCompletionObjectType, CreateChatCompletionResponse};
pub use stream::{
    ChatCompletionChunkObjectType, ChatCompletionStreamChoice, CreateChatCompletionStreamResponse,
};
pub use types::{
    ChatCompletionFinishReason, ChatCompletionMessageToolCall, ChatCompletionMessageToolCallChunk,
    ChatCompletionMessageToolCallChunkFunction, ChatCompletionMessageToolCallFunction,
    ChatCompletionNamedToolChoice, ChatCompletionNamedToolChoiceFunction,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
    ChatCompletionRequestUserMessage, ChatCompletionResponseMessage, ChatCompletionResponseRole,
    ChatCompletionRole, ChatCompletionStreamResponseDelta, ChatCompletionTextContent,
    ChatCompletionTextContentPart, ChatCompletionToolChoiceMode, ChatCompletionToolChoiceOption,
    ChatCompletionToolDefinition, ChatCompletionToolCallChunkType, CompletionUsage,
    FunctionObject, FunctionParameters, ReasoningEffort,
};

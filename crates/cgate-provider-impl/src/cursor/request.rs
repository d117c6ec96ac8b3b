//! Builds the nested Request protobuf Cursor expects from the normalised
//! chat-completion body. Field numbers and literal constants are exactly
//! as laid out for the Cursor Codec; `Instruction.text` and the `Metadata`
//! sub-fields are not pinned down by that description (no reference
//! implementation exists to check them against), so they're filled with the
//! most conservative values that keep the framing valid: an empty
//! instruction and this process's own platform/arch/timestamp.

use cgate_protocol::chat::{
    ChatCompletionRequestMessage, ChatCompletionTextContent, ChatCompletionTextContentPart,
    CreateChatCompletionRequestBody,
};

use super::proto::{write_bytes_field, write_message_field, write_string_field, write_varint_field};

const ROLE_USER: u64 = 1;
const ROLE_ASSISTANT: u64 = 2;

fn text_of(content: &ChatCompletionTextContent) -> String {
    match content {
        ChatCompletionTextContent::Text(text) => text.clone(),
        ChatCompletionTextContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ChatCompletionTextContentPart::Text { text } => text.as_str(),
            })
            .collect(),
    }
}

struct FlatMessage {
    id: String,
    role: u64,
    content: String,
}

fn flatten(messages: &[ChatCompletionRequestMessage]) -> Vec<FlatMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let id = format!("msg-{index}");
            match message {
                ChatCompletionRequestMessage::System(system) => FlatMessage {
                    id,
                    role: ROLE_USER,
                    content: format!("[System Instructions]\n{}", text_of(&system.content)),
                },
                ChatCompletionRequestMessage::User(user) => FlatMessage {
                    id,
                    role: ROLE_USER,
                    content: text_of(&user.content),
                },
                ChatCompletionRequestMessage::Assistant(assistant) => FlatMessage {
                    id,
                    role: ROLE_ASSISTANT,
                    content: assistant.content.as_ref().map(text_of).unwrap_or_default(),
                },
                ChatCompletionRequestMessage::Tool(tool) => FlatMessage {
                    id,
                    role: ROLE_USER,
                    content: format!("[Tool Result]\n{}", text_of(&tool.content)),
                },
            }
        })
        .collect()
}

fn write_message_id(buf: &mut Vec<u8>, id: &str, role: u64) {
    write_string_field(buf, 1, id);
    write_varint_field(buf, 3, role);
}

fn write_message(buf: &mut Vec<u8>, message: &FlatMessage) {
    write_string_field(buf, 1, &message.content);
    write_varint_field(buf, 2, message.role);
    write_message_field(buf, 13, |inner| write_message_id(inner, &message.id, message.role));
    if message.role == ROLE_USER {
        write_varint_field(buf, 47, 1);
    }
}

fn write_cursor_setting(buf: &mut Vec<u8>) {
    write_string_field(buf, 1, "cursor\\aisettings");
    write_string_field(buf, 3, "");
    write_message_field(buf, 6, |inner| {
        write_string_field(inner, 1, "");
        write_string_field(inner, 2, "");
    });
    write_varint_field(buf, 8, 1);
    write_varint_field(buf, 9, 1);
}

fn write_metadata(buf: &mut Vec<u8>) {
    write_string_field(buf, 1, std::env::consts::OS);
    write_string_field(buf, 2, std::env::consts::ARCH);
    write_string_field(buf, 3, env!("CARGO_PKG_VERSION"));
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    write_string_field(buf, 4, &cwd);
    write_varint_field(buf, 5, crate::jyh::now_ms());
}

/// Builds the request payload. Returns the encoded bytes and the message
/// count the caller needs to decide whether to gzip-frame it.
pub fn build_request(model: &str, body: &CreateChatCompletionRequestBody) -> (Vec<u8>, usize) {
    let messages = flatten(&body.messages);
    let request_uuid = uuid::Uuid::new_v4().to_string();

    let mut buf = Vec::new();
    for message in &messages {
        write_message_field(&mut buf, 1, |inner| write_message(inner, message));
    }
    write_varint_field(&mut buf, 2, 1);
    write_message_field(&mut buf, 3, |inner| write_string_field(inner, 1, ""));
    write_varint_field(&mut buf, 4, 1);
    write_message_field(&mut buf, 5, |inner| {
        write_string_field(inner, 1, model);
        write_string_field(inner, 4, "");
    });
    write_string_field(&mut buf, 8, "");
    write_varint_field(&mut buf, 13, 1);
    write_message_field(&mut buf, 15, write_cursor_setting);
    write_varint_field(&mut buf, 19, 1);
    write_string_field(&mut buf, 23, &request_uuid);
    write_message_field(&mut buf, 26, write_metadata);
    write_varint_field(&mut buf, 27, 0);
    for message in &messages {
        write_message_field(&mut buf, 30, |inner| write_message_id(inner, &message.id, message.role));
    }
    write_varint_field(&mut buf, 35, 0);
    write_varint_field(&mut buf, 38, 0);
    write_varint_field(&mut buf, 46, 1);
    write_string_field(&mut buf, 47, "");
    write_varint_field(&mut buf, 48, 0);
    write_varint_field(&mut buf, 49, 0);
    write_varint_field(&mut buf, 51, 0);
    write_varint_field(&mut buf, 53, 1);
    write_string_field(&mut buf, 54, "Ask");

    let mut outer = Vec::new();
    write_bytes_field(&mut outer, 1, &buf);
    (outer, messages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgate_protocol::chat::ChatCompletionRequestUserMessage;

    #[test]
    fn builds_non_empty_framed_request_for_a_single_message() {
        let body = CreateChatCompletionRequestBody {
            model: "gpt-5".to_string(),
            messages: vec![ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionTextContent::Text("hi".to_string()),
                name: None,
            })],
            tools: None,
            tool_choice: None,
            stream: Some(true),
            reasoning_effort: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            max_completion_tokens: None,
            stop: None,
            user: None,
        };
        let (bytes, count) = build_request("gpt-5", &body);
        assert_eq!(count, 1);
        assert!(!bytes.is_empty());
    }
}

//! Decodes one Cursor frame payload into normalised stream events.
//!
//! Inner protobuf field numbers for the tool-call sub-message (id,
//! function name, argument chunk, `isLast`) aren't pinned down any more
//! precisely than "a tool-call event" in the Cursor Codec description;
//! `1/2/3/4` below is this crate's own assignment, kept internally
//! consistent with [`super::request`].

use cgate_provider_core::StreamEvent;
use serde::Deserialize;

use super::proto::{read_fields, DecodeError, WireValue};
use super::toolcalls::ToolCallTracker;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Decodes one frame's payload, feeding tool-call chunks through `tracker`.
/// Returns `(events, stop)`: `stop` is set once an error envelope closes the
/// stream early.
pub fn decode_payload(payload: &[u8], tracker: &mut ToolCallTracker) -> (Vec<StreamEvent>, bool) {
    if payload.starts_with(br#"{"error"#) {
        return (vec![decode_error_envelope(payload)], true);
    }

    let fields = match read_fields(payload) {
        Ok(fields) => fields,
        Err(err) => return (vec![decode_failure_event(err)], false),
    };

    let mut events = Vec::new();
    for (field_number, value) in fields {
        match (field_number, value) {
            (2, WireValue::LenDelimited(inner)) => {
                if let Some(text) = decode_text_response(inner) {
                    events.push(StreamEvent::Text(text));
                }
            }
            (1, WireValue::LenDelimited(inner)) => {
                if let Some(event) = decode_tool_call(inner, tracker) {
                    events.push(event);
                }
            }
            _ => {}
        }
    }
    (events, false)
}

fn decode_error_envelope(payload: &[u8]) -> StreamEvent {
    match serde_json::from_slice::<ErrorEnvelope>(payload) {
        Ok(envelope) => StreamEvent::Error {
            is_rate_limit: envelope.error.code.as_deref() == Some("resource_exhausted"),
            message: envelope.error.message.unwrap_or_else(|| "cursor api error".to_string()),
        },
        Err(_) => StreamEvent::Error {
            message: "cursor api error".to_string(),
            is_rate_limit: false,
        },
    }
}

fn decode_failure_event(err: DecodeError) -> StreamEvent {
    tracing::warn!(event = "cursor_response_decode_failed", ?err);
    StreamEvent::Error {
        message: "malformed cursor response frame".to_string(),
        is_rate_limit: false,
    }
}

/// `StreamUnifiedChatResponse{1 L text}`.
fn decode_text_response(inner: &[u8]) -> Option<String> {
    let fields = read_fields(inner).ok()?;
    fields.into_iter().find_map(|(n, v)| match (n, v) {
        (1, WireValue::LenDelimited(text)) => Some(String::from_utf8_lossy(text).into_owned()),
        _ => None,
    })
}

fn decode_tool_call(inner: &[u8], tracker: &mut ToolCallTracker) -> Option<StreamEvent> {
    let fields = read_fields(inner).ok()?;
    let mut id = None;
    let mut name = None;
    let mut argument_chunk = String::new();
    let mut is_last = false;
    for (field_number, value) in fields {
        match (field_number, value) {
            (1, WireValue::LenDelimited(bytes)) => id = Some(String::from_utf8_lossy(bytes).into_owned()),
            (2, WireValue::LenDelimited(bytes)) => name = Some(String::from_utf8_lossy(bytes).into_owned()),
            (3, WireValue::LenDelimited(bytes)) => {
                argument_chunk = String::from_utf8_lossy(bytes).into_owned()
            }
            (4, WireValue::Varint(v)) => is_last = v != 0,
            _ => {}
        }
    }
    let id = id?;
    Some(tracker.observe(id, name, argument_chunk, is_last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::proto::{write_message_field, write_string_field, write_varint_field};

    #[test]
    fn decodes_text_delta_from_field_two() {
        let mut payload = Vec::new();
        write_message_field(&mut payload, 2, |inner| write_string_field(inner, 1, "hello"));
        let mut tracker = ToolCallTracker::new();
        let (events, stop) = decode_payload(&payload, &mut tracker);
        assert!(!stop);
        assert_eq!(events, vec![StreamEvent::Text("hello".to_string())]);
    }

    #[test]
    fn decodes_tool_call_chunk_from_field_one() {
        let mut payload = Vec::new();
        write_message_field(&mut payload, 1, |inner| {
            write_string_field(inner, 1, "call-1");
            write_string_field(inner, 2, "search");
            write_string_field(inner, 3, "{}");
            write_varint_field(inner, 4, 1);
        });
        let mut tracker = ToolCallTracker::new();
        let (events, stop) = decode_payload(&payload, &mut tracker);
        assert!(!stop);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::ToolCallDelta { id, is_last: true, .. } if id == "call-1"
        ));
    }

    #[test]
    fn error_envelope_stops_the_stream() {
        let payload = br#"{"error":{"code":"resource_exhausted","message":"slow down"}}"#;
        let mut tracker = ToolCallTracker::new();
        let (events, stop) = decode_payload(payload, &mut tracker);
        assert!(stop);
        assert_eq!(
            events,
            vec![StreamEvent::Error { message: "slow down".to_string(), is_rate_limit: true }]
        );
    }
}

//! Wire-level types shared by the gateway's ingress surface: OpenAI-compatible
//! chat-completion requests/responses and the SSE framing used to stream them.

pub mod chat;
pub mod sse;

//! The Cursor Executor: ConnectRPC framing over HTTP/2, a hand-rolled
//! protobuf codec, and the `jyh` checksum cipher. No reference
//! implementation of Cursor's protocol exists in this workspace's corpus;
//! everything here is built straight from the written description of the
//! wire format, not adapted from an existing file.

mod frame;
mod proto;
mod request;
mod response;
mod toolcalls;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use cgate_protocol::chat::CreateChatCompletionRequestBody;
use cgate_provider_core::{
    header_set, Connection, Executor, ExecutorFailure, ExecutorRequest, EventStream, Headers,
    Provider, ProviderConfig, ProviderError, ProviderResult, ProviderSpecificData, StreamEvent,
};

use crate::client::shared_client;
use crate::jyh;
use frame::{encode_frame, FrameDecoder};
use toolcalls::ToolCallTracker;

pub struct CursorExecutor;

impl CursorExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CursorExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn machine_id(connection: &Connection) -> ProviderResult<&str> {
    match &connection.provider_specific_data {
        ProviderSpecificData::Cursor { machine_id, .. } if !machine_id.is_empty() => Ok(machine_id),
        _ => Err(ProviderError::Other("Machine ID is required for Cursor API".to_string())),
    }
}

fn ghost_mode(connection: &Connection) -> bool {
    match &connection.provider_specific_data {
        ProviderSpecificData::Cursor { ghost_mode, .. } => *ghost_mode,
        _ => true,
    }
}

#[async_trait]
impl Executor for CursorExecutor {
    fn provider(&self) -> Provider {
        Provider::Cursor
    }

    fn build_url(
        &self,
        config: &ProviderConfig,
        _model: &str,
        _stream: bool,
        url_index: usize,
    ) -> ProviderResult<String> {
        let base = config
            .base_urls
            .get(url_index)
            .ok_or_else(|| ProviderError::InvalidConfig("no base URL at that index".to_string()))?;
        Ok(format!("{}{}", base.trim_end_matches('/'), config.chat_path))
    }

    fn build_headers(
        &self,
        _config: &ProviderConfig,
        connection: &Connection,
        _stream: bool,
    ) -> ProviderResult<Headers> {
        let machine_id = machine_id(connection)?;
        let access_token = connection
            .access_token
            .as_deref()
            .ok_or(ProviderError::MissingCredentialField("accessToken"))?;
        let clean = jyh::clean_token(access_token);

        let mut headers = Headers::new();
        header_set(&mut headers, "authorization", format!("Bearer {clean}"));
        header_set(&mut headers, "connect-accept-encoding", "gzip");
        header_set(&mut headers, "connect-protocol-version", "1");
        header_set(&mut headers, "content-type", "application/connect+proto");
        header_set(&mut headers, "x-cursor-checksum", format!("{}{machine_id}", jyh::jyh_encode(jyh::now_ms())));
        header_set(&mut headers, "x-client-key", jyh::client_key(clean));
        header_set(&mut headers, "x-session-id", jyh::session_id(clean).to_string());
        header_set(&mut headers, "x-cursor-client-version", env!("CARGO_PKG_VERSION"));
        header_set(&mut headers, "x-cursor-platform", std::env::consts::OS);
        header_set(&mut headers, "x-cursor-arch", std::env::consts::ARCH);
        header_set(&mut headers, "x-ghost-mode", if ghost_mode(connection) { "true" } else { "false" });
        header_set(&mut headers, "x-amzn-trace-id", uuid::Uuid::new_v4().to_string());
        header_set(&mut headers, "x-cursor-config-version", uuid::Uuid::new_v4().to_string());
        header_set(&mut headers, "x-request-id", uuid::Uuid::new_v4().to_string());
        Ok(headers)
    }

    fn transform_request(
        &self,
        model: &str,
        body: &CreateChatCompletionRequestBody,
        _stream: bool,
        _connection: &Connection,
    ) -> ProviderResult<Bytes> {
        let (payload, message_count) = request::build_request(model, body);
        Ok(encode_frame(&payload, message_count))
    }

    async fn execute(&self, request: ExecutorRequest<'_>) -> Result<EventStream, ExecutorFailure> {
        let headers = self
            .build_headers(request.config, request.connection, request.stream)
            .map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;
        let body = self
            .transform_request(&request.model, request.body, request.stream, request.connection)
            .map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;

        cgate_provider_core::execute_with_base_url_fallback(&request.config.base_urls, |_url, index| {
            let headers = headers.clone();
            let body = body.clone();
            let url = self.build_url(request.config, &request.model, request.stream, index);
            async move {
                let url = url.map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;
                send_cursor_request(&url, headers, body).await
            }
        })
        .await
    }
}

async fn send_cursor_request(url: &str, headers: Headers, body: Bytes) -> Result<EventStream, ExecutorFailure> {
    let mut req = shared_client().post(url).body(body);
    for (name, value) in &headers {
        req = req.header(name.as_str(), value.as_str());
    }
    let response = req
        .send()
        .await
        .map_err(|err| ExecutorFailure::Transport { message: err.to_string() })?;

    let status = response.status().as_u16();
    if status != 200 {
        let body_text = response
            .text()
            .await
            .unwrap_or_else(|_| "cursor upstream error".to_string());
        return Err(ExecutorFailure::Http { status, headers: Headers::new(), body_text });
    }

    let (tx, rx) = tokio::sync::mpsc::channel(32);
    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut tracker = ToolCallTracker::new();
        let mut body_stream = response.bytes_stream();
        while let Some(chunk) = body_stream.next().await {
            let Ok(chunk) = chunk else { break };
            decoder.push(&chunk);
            let mut stopped = false;
            for frame in decoder.drain_frames() {
                let (events, stop) = response::decode_payload(&frame.payload, &mut tracker);
                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                if stop {
                    stopped = true;
                    break;
                }
            }
            if stopped {
                return;
            }
        }
        for event in tracker.finalize_remaining() {
            let _ = tx.send(event).await;
        }
    });
    Ok(rx)
}

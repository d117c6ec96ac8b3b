//! The six named error kinds the Dispatch Loop can surface, and the
//! OpenAI-shaped `{error: {message, type, code}}` envelope they render as.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use cgate_storage::StorageError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InputError,
    NoCredentials,
    UpstreamError,
    AllAccountsUnavailable,
    ComboExhausted,
    InternalError,
}

impl ApiErrorKind {
    fn code(self) -> &'static str {
        match self {
            ApiErrorKind::InputError => "input_error",
            ApiErrorKind::NoCredentials => "no_credentials",
            ApiErrorKind::UpstreamError => "upstream_error",
            ApiErrorKind::AllAccountsUnavailable => "all_accounts_unavailable",
            ApiErrorKind::ComboExhausted => "combo_exhausted",
            ApiErrorKind::InternalError => "internal_error",
        }
    }

    fn default_status(self) -> StatusCode {
        match self {
            ApiErrorKind::InputError => StatusCode::BAD_REQUEST,
            ApiErrorKind::NoCredentials => StatusCode::BAD_REQUEST,
            ApiErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
            ApiErrorKind::AllAccountsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorKind::ComboExhausted => StatusCode::NOT_ACCEPTABLE,
            ApiErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status: StatusCode,
    pub retry_after_ms: Option<i64>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.default_status(),
            kind,
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_retry_after_ms(mut self, ms: i64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    pub fn input_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InputError, message)
    }

    pub fn no_credentials(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NoCredentials, message)
    }

    pub fn upstream_error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::UpstreamError, message).with_status(status)
    }

    pub fn all_accounts_unavailable(message: impl Into<String>, retry_after_ms: i64) -> Self {
        Self::new(ApiErrorKind::AllAccountsUnavailable, message).with_retry_after_ms(retry_after_ms)
    }

    pub fn combo_exhausted(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ComboExhausted, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InternalError, message)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    message: &'a str,
    r#type: &'a str,
    code: &'a str,
}

/// `ceil(ms / 1000)`, floored at 1 second, per the wire contract for
/// `Retry-After`.
fn retry_after_seconds(ms: i64) -> u64 {
    let ms = ms.max(0);
    (((ms + 999) / 1000).max(1)) as u64
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                message: &self.message,
                r#type: self.kind.code(),
                code: self.kind.code(),
            },
        };
        let mut resp = (self.status, Json(body)).into_response();
        if let Some(ms) = self.retry_after_ms
            && let Ok(value) = HeaderValue::from_str(&retry_after_seconds(ms).to_string())
        {
            resp.headers_mut().insert(header::RETRY_AFTER, value);
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up_and_floors_at_one() {
        assert_eq!(retry_after_seconds(0), 1);
        assert_eq!(retry_after_seconds(1), 1);
        assert_eq!(retry_after_seconds(1000), 1);
        assert_eq!(retry_after_seconds(1001), 2);
        assert_eq!(retry_after_seconds(59_000), 59);
    }
}

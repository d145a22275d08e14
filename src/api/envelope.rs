//! JSON envelope for `/api/v1`.
//!
//! Success bodies are `{ "data": .., "meta": .. }`. Failures are
//! `{ "error": { "code", "message", "document"?, "line"? }, "meta": .. }`,
//! produced directly from the knowledge base error types so handlers can
//! use `?` on query and load results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::knowledge_base::{LoadError, QueryError};

const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            version: API_VERSION,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    /// Serialize `data` into a 200 response. Borrowed entries are rendered
    /// here, while the caller still holds its snapshot.
    pub fn ok(data: T) -> Response {
        Json(Self {
            data,
            meta: ResponseMeta::now(),
        })
        .into_response()
    }
}

/// Error payload. `document` and `line` locate a malformed source document.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn respond(status: StatusCode, error: ErrorDetail) -> Response {
        let body = Self {
            error,
            meta: ResponseMeta::now(),
        };
        (status, Json(body)).into_response()
    }

    /// 500 for failures outside the knowledge base (e.g. a panicked task).
    pub fn internal(message: impl Into<String>) -> Response {
        Self::respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetail {
                code: "INTERNAL_ERROR",
                message: message.into(),
                document: None,
                line: None,
            },
        )
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let code = match self {
            Self::EmptyQuery => "EMPTY_QUERY",
        };
        ApiErrorResponse::respond(
            StatusCode::BAD_REQUEST,
            ErrorDetail {
                code,
                message: self.to_string(),
                document: None,
                line: None,
            },
        )
    }
}

/// A load error only reaches the API through a rebuild; the served
/// snapshot is unchanged, hence 422 rather than 500.
impl IntoResponse for LoadError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (document, line) = match self {
            Self::MalformedDocument { document, line, .. } => (Some(document), Some(line)),
            Self::Io { path, .. } => (Some(path.display().to_string()), None),
        };
        ApiErrorResponse::respond(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail {
                code: "RELOAD_FAILED",
                message,
                document,
                line,
            },
        )
    }
}

//! Handler replies and the error taxonomy mapped onto them.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use keystone_infra::StoreError;

/// What a handler hands back to the dispatcher: a status and an optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<JsonValue>,
}

impl Reply {
    pub fn new(status: StatusCode, body: Option<JsonValue>) -> Self {
        Self { status, body }
    }

    /// 200 with an empty object body.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK, None)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, None)
    }

    /// 200 with `value` serialized as the body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self::new(StatusCode::OK, Some(body)))
    }

    /// The body actually written: anything that is not object-like becomes `{}`.
    pub fn rendered_body(&self) -> JsonValue {
        match &self.body {
            Some(body @ (JsonValue::Object(_) | JsonValue::Array(_))) => body.clone(),
            _ => json!({}),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.rendered_body())).into_response()
    }
}

/// Conversion of handler return values into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for ApiError {
    fn into_reply(self) -> Reply {
        match self {
            ApiError::NotFound => Reply::not_found(),
            other => json_error(other.status(), other.to_string()),
        }
    }
}

impl<T: IntoReply, E: IntoReply> IntoReply for Result<T, E> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(v) => v.into_reply(),
            Err(e) => e.into_reply(),
        }
    }
}

/// Handler-boundary error. Every variant is recovered into a response.
///
/// Two flavours of "missing record" exist: [`ApiError::NotFound`] for direct
/// lookups (404) and [`ApiError::Precondition`] when another operation needed
/// the record to exist (400).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Precondition(String),

    /// Duplicate create.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn missing_fields() -> Self {
        Self::Validation("Missing required fields.".to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Storage failure with a client-facing message; the cause is logged.
    pub fn storage(msg: impl Into<String>, cause: &StoreError) -> Self {
        let msg = msg.into();
        tracing::error!(error = %cause, "{msg}");
        Self::Storage(msg)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Precondition(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Reply {
    Reply::new(status, Some(json!({ "Error": message.into() })))
}

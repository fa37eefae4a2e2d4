//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::executor::ErrorCode;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the gateway.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors (malformed definitions, bad admin input).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (unknown tool).
    #[error("not found: {0}")]
    NotFound(String),

    /// Tool declares a transport kind the executor cannot dispatch.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Tool store unreachable or failed.
    #[error("store error: {0}")]
    Store(String),

    /// Downstream call exceeded its budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Downstream HTTP errors.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map to the executor envelope code.
    ///
    /// Everything that is not a lookup miss or an unknown transport kind
    /// surfaces to callers as `INTERNAL`.
    pub fn envelope_code(&self) -> ErrorCode {
        match self {
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::UnsupportedType(_) => ErrorCode::UnsupportedType,
            _ => ErrorCode::Internal,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedType(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

// Admin handlers return `Result<_, Error>`; the body mirrors the envelope shape.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = serde_json::json!({
            "ok": false,
            "error": {
                "code": self.envelope_code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

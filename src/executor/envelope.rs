//! Normalized call result returned by the executor and the plain front end.
//!
//! Wire shape:
//! ```text
//! {"ok": true,  "result": <decoded downstream body>}
//! {"ok": false, "error": {"code": "NOT_FOUND" | "UNSUPPORTED_TYPE" | "INTERNAL", "message": "..."}}
//! ```

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Executor-level error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    UnsupportedType,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Failure(EnvelopeError),
}

impl Envelope {
    pub fn ok(result: Value) -> Self {
        Envelope::Success(result)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Envelope::Failure(EnvelopeError {
            code,
            message: message.into(),
        })
    }

    pub fn not_found(tool: &str) -> Self {
        Self::error(ErrorCode::NotFound, format!("Tool not found: {}", tool))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure(err) => Some(err.code),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Envelope::Success(result) => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("result", result)?;
            }
            Envelope::Failure(error) => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

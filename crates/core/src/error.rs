use serde::Serialize;
use thiserror::Error;

use crate::types::ErrorKind;

/// Unified API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Failure with a domain kind preserved from the upstream client or reconciler.
    #[error("{message}")]
    Kind { kind: ErrorKind, message: String },
}

impl ApiError {
    pub fn kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Kind {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
            Self::Kind { kind, .. } => kind.as_str(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
            Self::Kind { kind, .. } => kind.status_code(),
        }
    }
}

/// JSON error envelope: `{ "error": { "code": "…", "message": "…", "details": {} } }`
#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(e: &ApiError) -> Self {
        let mut details = serde_json::Map::new();
        if let ApiError::Kind { kind, .. } = e {
            details.insert("kind".to_string(), kind.as_str().into());
        }
        Self {
            error: ErrorBody {
                code: e.code().to_string(),
                message: e.to_string(),
                details: serde_json::Value::Object(details),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_kind() {
        let err = ApiError::kind(ErrorKind::UpstreamUnavailable, "timed out");
        assert_eq!(err.status_code(), 503);
        let env = serde_json::to_value(ErrorEnvelope::from(&err)).unwrap();
        assert_eq!(env["error"]["code"], "upstream_unavailable");
        assert_eq!(env["error"]["message"], "timed out");
        assert_eq!(env["error"]["details"]["kind"], "upstream_unavailable");
    }

    #[test]
    fn plain_errors_have_empty_details() {
        let err = ApiError::BadRequest("title is required".into());
        let env = serde_json::to_value(ErrorEnvelope::from(&err)).unwrap();
        assert_eq!(env["error"]["code"], "bad_request");
        assert_eq!(env["error"]["details"], serde_json::json!({}));
    }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::cdm::CdmError;

/// Gateway-level errors. Every variant maps to an HTTP status and is
/// rendered to clients as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required request field was absent or empty.
    #[error("{0} field can not be empty")]
    MissingField(&'static str),

    /// The passkey header was absent, unknown, or revoked.
    #[error("missing or invalid passkey")]
    Auth,

    /// A transport-encoded field failed to decode.
    #[error("failed to decode {field}: {reason}")]
    Decode {
        field: &'static str,
        reason: String,
    },

    /// The license exchange itself failed.
    #[error(transparent)]
    Cdm(#[from] CdmError),

    /// A credential file could not be read.
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    /// A lookup came back empty.
    #[error("{0}")]
    NotFound(&'static str),

    /// Random generation failed.
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// Database failure.
    #[error("store failure: {0}")]
    Store(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

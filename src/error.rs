// src/error.rs
//! Error types for the upstream client and the HTTP facade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Failure talking to the NEIS hub. Never retried here; callers decide
/// whether it means "no data" or a hard failure.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network-level failure. The request URL (which carries the access key)
    /// is stripped before the error is stored.
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("upstream response is not valid JSON: {0}")]
    Decode(String),

    #[error("upstream `{resource}` payload has an unexpected shape")]
    Shape { resource: String },
}

impl UpstreamError {
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }

    /// Raw upstream payload, when the provider answered with one.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingParams(&'static str),

    #[error("{0}")]
    InvalidParam(String),

    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: UpstreamError,
    },
}

impl ApiError {
    pub fn upstream(message: &'static str, source: UpstreamError) -> Self {
        Self::Upstream { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParams(_) | Self::InvalidParam(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream { message, source } => {
                tracing::error!(error = %source, "{message}");
                match source.details() {
                    Some(details) => json!({ "error": message, "details": details }),
                    None => json!({ "error": message }),
                }
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

//! Application error taxonomy and HTTP mapping.
//!
//! Two classes of failure reach the wire: client input errors from the
//! validator (400 with the specific message) and upstream failures
//! (500 with a generic envelope carrying the underlying message). A failed
//! tag query never reaches this module; it is recovered in the report
//! handler and merely logged.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors that terminate a request.
#[derive(Debug, Error)]
pub enum AppError {
    /// A validator rule failed; the message is returned verbatim.
    #[error("{0}")]
    Validation(String),

    /// Authentication or a fatal upstream call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Failures talking to Azure.
///
/// The split between request variants (transport-level `reqwest` failures)
/// and rejection variants (non-2xx responses) keeps the status and body of
/// an upstream rejection visible in the logs.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Azure credentials are not configured: {0} is unset")]
    MissingCredentials(&'static str),

    #[error("token request failed: {0}")]
    TokenRequest(#[source] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    TokenRejected { status: StatusCode, body: String },

    #[error("cost query failed: {0}")]
    CostRequest(#[source] reqwest::Error),

    #[error("cost endpoint returned {status}: {body}")]
    CostRejected { status: StatusCode, body: String },

    #[error("tag query failed: {0}")]
    TagRequest(#[source] reqwest::Error),

    #[error("tag endpoint returned {status}: {body}")]
    TagRejected { status: StatusCode, body: String },
}

/// 400 body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
struct ValidationBody {
    error: String,
}

/// 500 body: `{"error": "Internal server error", "message": "..."}`.
#[derive(Debug, Serialize)]
struct ServerErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                tracing::warn!(error = %message, "request rejected by validator");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ValidationBody { error: message }),
                )
                    .into_response()
            }
            AppError::Upstream(error) => {
                tracing::error!(error = %error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ServerErrorBody {
                        error: "Internal server error",
                        message: error.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

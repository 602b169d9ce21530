use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use upstream::FetchError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `MISSING_PARAMETER`,
    /// `VALIDATION_ERROR`, `MISCONFIGURATION`, `UPSTREAM_UNAVAILABLE`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "MISSING_PARAMETER")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Missing required parameter: projectId")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    MissingParameter(&'static str),
    Validation(String),
    /// Server-side configuration prevents talking to upstream.
    Misconfiguration(String),
    UpstreamUnavailable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::MissingParameter(name) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "MISSING_PARAMETER",
                    message: format!("Missing required parameter: {name}"),
                },
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::Misconfiguration(detail) => {
                tracing::error!("Misconfiguration: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "MISCONFIGURATION",
                        message: detail,
                    },
                )
            }
            AppError::UpstreamUnavailable(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: "UPSTREAM_UNAVAILABLE",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::MissingParameter(name) => AppError::MissingParameter(name),
            FetchError::Misconfiguration(detail) => AppError::Misconfiguration(detail),
            FetchError::UpstreamUnavailable { .. } => {
                tracing::warn!("Upstream unavailable: {err}");
                AppError::UpstreamUnavailable(err.to_string())
            }
            FetchError::Client(e) => AppError::Internal(e.to_string()),
        }
    }
}

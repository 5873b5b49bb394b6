//! JSON response helpers
//!
//! Every endpoint answers with `{"success": bool, ...}`; failures carry an
//! `error` string.

use crate::cors::CorsDecision;
use crate::error::{GateError, UpstreamError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failure body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Build a `{success: false, error}` response
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

/// Empty-bodied preflight answer carrying the CORS headers
pub fn preflight_response(cors: &CorsDecision) -> Response {
    let mut response = cors.status.unwrap_or(StatusCode::OK).into_response();
    cors.apply(response.headers_mut());
    response
}

pub fn method_not_allowed() -> Response {
    GateError::MethodNotAllowed.into_response()
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.message())
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        let message = match &self {
            UpstreamError::Request(e) if e.is_timeout() => "Upstream request timed out".to_string(),
            UpstreamError::Request(_) => "Upstream request failed".to_string(),
            UpstreamError::Api {
                service, message, ..
            } => format!("{} provider error: {}", service, message),
            other => other.to_string(),
        };
        error_response(self.status(), message)
    }
}

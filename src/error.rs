//! Error types for unigraph-api
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors that are part of the API,
//! and convert to JSON HTTP responses at the boundary.

use axum::http::StatusCode;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors produced by the identity verifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or one without the exact `Bearer ` prefix
    #[error("Authorization header required. Format: Bearer <token>")]
    MissingAuthHeader,

    /// Rejected, malformed or unverifiable token. The detail never contains the token.
    #[error("Invalid or expired token")]
    InvalidToken { detail: Option<String> },
}

impl AuthError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        AuthError::InvalidToken {
            detail: Some(detail.into()),
        }
    }
}

/// Terminal failures of the access gate
///
/// Preflights are not failures; they are carried by
/// [`crate::cors::CorsDecision`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Server misconfiguration: {key} environment variable is not set")]
    ConfigurationMissing { key: &'static str },

    #[error("Authorization header required. Format: Bearer <token>")]
    MissingAuthHeader,

    #[error("Invalid or expired token")]
    InvalidToken { detail: Option<String> },

    #[error("User is not authorized")]
    NotAuthorized,
}

impl GateError {
    /// HTTP status the gate answers with
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GateError::ConfigurationMissing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GateError::MissingAuthHeader
            | GateError::InvalidToken { .. }
            | GateError::NotAuthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// User-facing error string, with authority detail appended when present
    pub fn message(&self) -> String {
        match self {
            GateError::InvalidToken {
                detail: Some(detail),
            } => format!("{}: {}", self, detail),
            _ => self.to_string(),
        }
    }
}

impl From<AuthError> for GateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuthHeader => GateError::MissingAuthHeader,
            AuthError::InvalidToken { detail } => GateError::InvalidToken { detail },
        }
    }
}

/// Errors talking to the auth provider's login API or the chat provider
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} API error (HTTP {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl UpstreamError {
    /// Create an API error from an HTTP status and response body
    ///
    /// Both providers report failures as JSON with one of a handful of
    /// message fields; the first one present wins. Any other body (proxy
    /// HTML pages, plain text) is reduced to `HTTP {status}`, and messages
    /// are capped at [`MAX_UPSTREAM_MESSAGE_CHARS`].
    pub fn from_response(service: &'static str, status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["error_description", "msg", "message"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
                    .or_else(|| {
                        v.get("error")
                            .and_then(|e| e.get("message").or(Some(e)))
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    })
            })
            .map(|m| truncate_message(m.trim()))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));

        UpstreamError::Api {
            service,
            status,
            message,
        }
    }

    /// HTTP status to relay to the caller
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Longest provider message relayed to callers
pub const MAX_UPSTREAM_MESSAGE_CHARS: usize = 200;

fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_UPSTREAM_MESSAGE_CHARS) {
        Some((end, _)) => format!("{}...", &message[..end]),
        None => message.to_string(),
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for upstream provider calls
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

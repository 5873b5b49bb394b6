//! Endpoint handlers
//!
//! Thin pass-throughs to the upstream providers. CORS and, for the chat
//! endpoints, access control are applied by middleware before these run.

use crate::auth::Identity;
use crate::config::runtime_mode;
use crate::error::UpstreamError;
use crate::server::response::{error_response, method_not_allowed, preflight_response};
use crate::server::state::AppState;
use crate::upstream::{ChatMessage, ChatRequest, Session, Usage};
use axum::{
    Extension, Json,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SERVICE_NAME: &str = "unigraph-api";

#[derive(Serialize)]
struct HealthBody {
    success: bool,
    status: &'static str,
    service: &'static str,
    version: &'static str,
    mode: &'static str,
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>, method: Method) -> Response {
    if method != Method::GET {
        return method_not_allowed();
    }

    Json(HealthBody {
        success: true,
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        mode: runtime_mode(state.config.as_ref()).as_str(),
    })
    .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct SessionBody {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
}

#[derive(Serialize)]
struct UserBody {
    id: String,
    email: Option<String>,
}

#[derive(Serialize)]
struct LoginBody {
    success: bool,
    session: SessionBody,
    user: UserBody,
}

impl From<Session> for LoginBody {
    fn from(session: Session) -> Self {
        Self {
            success: true,
            session: SessionBody {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
                expires_in: session.expires_in,
                token_type: session.token_type,
            },
            user: UserBody {
                id: session.user.id,
                email: session.user.email,
            },
        }
    }
}

/// `POST /api/login`
pub async fn login(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return method_not_allowed();
    }

    let request: LoginRequest = match parse_json(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (Some(email), Some(password)) = (
        request.email.filter(|e| !e.trim().is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "Email and password are required");
    };

    let Some(auth) = state.auth.as_ref() else {
        return UpstreamError::NotConfigured("Identity authority").into_response();
    };

    match auth.sign_in(email.trim(), &password).await {
        Ok(session) => {
            info!(user_id = %session.user.id, "Login succeeded");
            Json(LoginBody::from(session)).into_response()
        }
        Err(UpstreamError::Api {
            status: 400 | 401 | 403 | 422,
            message,
            ..
        }) => {
            info!("Login rejected by identity authority");
            error_response(StatusCode::UNAUTHORIZED, message)
        }
        Err(e) => {
            warn!(error = %e, "Login request failed");
            e.into_response()
        }
    }
}

#[derive(Serialize)]
struct ChatUser {
    id: String,
    email: String,
}

impl From<&Identity> for ChatUser {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatBody {
    success: bool,
    message: ChatMessage,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
    user: ChatUser,
}

/// `POST /api/chat` (behind the access gate)
pub async fn chat(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Response {
    let request = match parse_chat_request(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let Some(chat) = state.chat.as_ref() else {
        return UpstreamError::NotConfigured("Chat provider").into_response();
    };

    match chat.complete(&request).await {
        Ok(completion) => {
            info!(user_id = %identity.id, model = %completion.model, "Chat completed");
            Json(ChatBody {
                success: true,
                message: completion.message,
                model: completion.model,
                usage: completion.usage,
                user: ChatUser::from(&identity),
            })
            .into_response()
        }
        Err(e) => {
            warn!(user_id = %identity.id, error = %e, "Chat request failed");
            e.into_response()
        }
    }
}

/// `POST /api/chat/stream` (behind the access gate)
///
/// Relays the provider's event stream byte-for-byte.
pub async fn chat_stream(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Response {
    let request = match parse_chat_request(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let Some(chat) = state.chat.as_ref() else {
        return UpstreamError::NotConfigured("Chat provider").into_response();
    };

    match chat.stream(&request).await {
        Ok(stream) => {
            info!(user_id = %identity.id, "Chat stream opened");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(e) => {
            warn!(user_id = %identity.id, error = %e, "Chat stream failed");
            e.into_response()
        }
    }
}

/// JSON 404 for unknown paths
///
/// Route layers do not reach the fallback, so the origin policy is applied
/// here: preflights are answered with 200 and the 404 carries CORS headers.
pub async fn not_found(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    let decision = state.rules.evaluate(origin, &method);
    if decision.terminate {
        return preflight_response(&decision);
    }

    let mut response = error_response(StatusCode::NOT_FOUND, "Not found");
    decision.apply(response.headers_mut());
    response
}

fn parse_chat_request(body: &Bytes) -> Result<ChatRequest, Response> {
    let request: ChatRequest = parse_json(body)?;
    if request.messages.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "messages must be a non-empty array",
        ));
    }
    Ok(request)
}

/// Parse a JSON body; an empty body parses as the type's default
fn parse_json<T: serde::de::DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Request body must be valid JSON"))
}

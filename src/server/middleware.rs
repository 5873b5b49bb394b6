//! Middleware applying origin and gate decisions to requests

use crate::gate::{AccessDecision, GateOutcome};
use crate::server::response::{error_response, preflight_response};
use crate::server::state::AppState;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

/// CORS for unprotected endpoints
///
/// Answers preflights directly; otherwise runs the handler and adds the
/// CORS headers to whatever it returns.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let decision = state.rules.evaluate(origin, request.method());

    if decision.terminate {
        return preflight_response(&decision);
    }

    let mut response = next.run(request).await;
    decision.apply(response.headers_mut());
    response
}

/// Access gate for protected endpoints
///
/// On success the verified [`crate::auth::Identity`] is inserted into the
/// request extensions and the handler runs once. Every failure is answered
/// here; the handler never sees it.
pub async fn access_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let GateOutcome { cors, decision } = state
        .gate
        .evaluate(request.method(), request.headers())
        .await;

    if cors.terminate {
        return preflight_response(&cors);
    }

    let mut response = match decision {
        AccessDecision {
            allowed: true,
            identity: Some(identity),
            ..
        } => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AccessDecision {
            failure: Some(failure),
            ..
        } => failure.into_response(),
        other => {
            error!(?other, "Inconsistent access decision");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };

    cors.apply(response.headers_mut());
    response
}

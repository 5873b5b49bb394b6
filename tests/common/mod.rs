//! Shared helpers for router-level tests

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use unigraph_api::auth::SharedVerifier;
use unigraph_api::config::{
    APP_ENV_KEY, APPROVED_USERS_KEY, AuthConfig, ChatConfig, CorsConfig, MapProvider,
    RuntimeMode,
};
use unigraph_api::cors::OriginRules;
use unigraph_api::upstream::{ChatClient, SupabaseClient};
use unigraph_api::util::SecretString;
use unigraph_api::{AppState, router};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ANON_KEY: &str = "anon-test-key";
pub const GOOD_TOKEN: &str = "good-token";
pub const OUTSIDER_TOKEN: &str = "outsider-token";
pub const APPROVED_EMAIL: &str = "alice@example.com";

/// Production provider approving [`APPROVED_EMAIL`]
pub fn production() -> MapProvider {
    MapProvider::new()
        .with(APP_ENV_KEY, "production")
        .with(APPROVED_USERS_KEY, APPROVED_EMAIL)
}

pub fn auth_config(url: &str) -> AuthConfig {
    AuthConfig {
        url: Some(url.to_string()),
        anon_key: Some(SecretString::new(ANON_KEY)),
        timeout_secs: 5,
    }
}

pub fn chat_config(url: &str) -> ChatConfig {
    ChatConfig {
        base_url: format!("{}/v1", url),
        api_key: Some(SecretString::new("sk-test")),
        timeout_secs: 5,
        ..Default::default()
    }
}

/// Build a router against mock upstreams
pub fn build_router(
    auth: Option<&MockServer>,
    chat: Option<&MockServer>,
    cors: CorsConfig,
    provider: MapProvider,
) -> Router {
    build_router_for_urls(
        auth.map(|s| s.uri()),
        chat.map(|s| s.uri()),
        cors,
        provider,
    )
}

/// Build a router against arbitrary upstream base URLs
pub fn build_router_for_urls(
    auth_url: Option<String>,
    chat_url: Option<String>,
    cors: CorsConfig,
    provider: MapProvider,
) -> Router {
    let rules = Arc::new(OriginRules::new(&cors, RuntimeMode::Production).unwrap());
    let auth_client = auth_url.map(|url| {
        Arc::new(
            SupabaseClient::from_config(&auth_config(&url))
                .unwrap()
                .unwrap(),
        )
    });
    let verifier = auth_client.clone().map(|c| c as SharedVerifier);
    let chat_client = chat_url.map(|url| {
        Arc::new(
            ChatClient::from_config(&chat_config(&url))
                .unwrap()
                .unwrap(),
        )
    });

    router(AppState::new(
        rules,
        auth_client,
        verifier,
        chat_client,
        Arc::new(provider),
    ))
}

/// Base URL of a local port with nothing listening on it
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Mount the authority's user endpoint: alice is approved, the outsider is
/// valid but not allow-listed, everything else is rejected.
pub async fn mount_authority(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", format!("Bearer {}", GOOD_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": APPROVED_EMAIL,
            "role": "authenticated",
            "app_metadata": {"provider": "email"}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {}", OUTSIDER_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-2",
            "email": "mallory@example.com"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "error_code": "bad_jwt",
            "msg": "invalid JWT: unable to parse or verify signature"
        })))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Mount a user endpoint that must never be called
pub async fn mount_unreachable_authority(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": APPROVED_EMAIL
        })))
        .expect(0)
        .mount(server)
        .await;
}

pub fn chat_completion_body() -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello there"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

pub fn chat_request_body() -> String {
    json!({"messages": [{"role": "user", "content": "Hi"}]}).to_string()
}

/// Request builder with optional origin and authorization headers
pub fn request(
    method: &str,
    uri: &str,
    origin: Option<&str>,
    authorization: Option<&str>,
    body: impl Into<Body>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(origin) = origin {
        builder = builder.header("origin", origin);
    }
    if let Some(authorization) = authorization {
        builder = builder.header("authorization", authorization);
    }
    builder.body(body.into()).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

//! Supabase auth client
//!
//! Implements [`IdentityVerifier`] against `GET /auth/v1/user` and proxies the
//! password login grant.

use crate::auth::{Identity, IdentityVerifier};
use crate::config::AuthConfig;
use crate::error::{AuthError, UpstreamError, UpstreamResult};
use crate::util::SecretString;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const SERVICE: &str = "auth";

/// Supabase auth API client
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: SecretString,
}

/// User object as returned by the authority
#[derive(Debug, Deserialize)]
struct AuthorityUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    app_metadata: Option<AppMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    role: Option<String>,
}

/// Either a bare user object or one wrapped as `{"user": {...}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserResponse {
    Wrapped { user: AuthorityUser },
    Bare(AuthorityUser),
}

impl UserResponse {
    fn into_user(self) -> AuthorityUser {
        match self {
            UserResponse::Wrapped { user } | UserResponse::Bare(user) => user,
        }
    }
}

/// Session issued by a successful password login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseClient {
    /// Create a client, or `None` if the connection info is not configured
    pub fn from_config(config: &AuthConfig) -> UpstreamResult<Option<Self>> {
        let Some((url, key)) = config.connection() else {
            return Ok(None);
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("unigraph-api/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Some(Self {
            http,
            base_url: url.to_string(),
            anon_key: key.clone(),
        }))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.anon_key.expose_secret())
    }

    /// Exchange email and password for a session
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> UpstreamResult<Session> {
        let request = self
            .with_key(self.http.post(self.url("/token")))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(SERVICE, status.as_u16(), &body));
        }

        response
            .json::<Session>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                message: format!("Failed to parse session: {}", e),
            })
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseClient {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let request = self
            .with_key(self.http.get(self.url("/user")))
            .bearer_auth(token);

        let response = request.send().await.map_err(|e| {
            warn!(timeout = e.is_timeout(), "Identity authority request failed");
            if e.is_timeout() {
                AuthError::invalid("identity authority timed out")
            } else {
                AuthError::invalid("identity authority unreachable")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Token rejected by authority");
            let detail = match UpstreamError::from_response(SERVICE, status.as_u16(), &body) {
                UpstreamError::Api { message, .. } => message,
                other => other.to_string(),
            };
            return Err(AuthError::invalid(detail));
        }

        let user = response
            .json::<UserResponse>()
            .await
            .map_err(|_| AuthError::invalid("malformed identity response"))?
            .into_user();

        let email = user
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::invalid("identity has no email"))?;
        let role = user.app_metadata.and_then(|m| m.role);

        Ok(Identity::new(user.id, email, role))
    }

    fn authority(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured() {
        let config = AuthConfig::default();
        assert!(SupabaseClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_url() {
        let config = AuthConfig {
            url: Some("https://abc.supabase.co/".to_string()),
            anon_key: Some(SecretString::new("anon")),
            ..Default::default()
        };
        let client = SupabaseClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.url("/user"), "https://abc.supabase.co/auth/v1/user");
    }

    #[test]
    fn test_user_response_shapes() {
        let bare: UserResponse = serde_json::from_str(
            r#"{"id":"u1","email":"a@example.com","role":"authenticated","app_metadata":{"role":"editor"}}"#,
        )
        .unwrap();
        let user = bare.into_user();
        assert_eq!(user.id, "u1");
        assert_eq!(user.app_metadata.unwrap().role.as_deref(), Some("editor"));

        let wrapped: UserResponse =
            serde_json::from_str(r#"{"user":{"id":"u2","email":"b@example.com"}}"#).unwrap();
        let user = wrapped.into_user();
        assert_eq!(user.id, "u2");
        assert!(user.app_metadata.is_none());
    }
}

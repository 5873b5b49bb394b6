//! Identity verifier trait and bearer-token handling

use crate::auth::identity::Identity;
use crate::config::RuntimeMode;
use crate::error::AuthError;
// async_trait required for dyn-compatibility with Arc<dyn IdentityVerifier>
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exact, case-sensitive scheme prefix of the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

/// External authority that exchanges a bearer token for an identity
///
/// Implementations must report every non-success outcome (transport error,
/// rejection, malformed response) as [`AuthError::InvalidToken`], and must
/// not include the token in the error detail.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// Name of the authority (for logging)
    fn authority(&self) -> &'static str;
}

/// Shared verifier handle
pub type SharedVerifier = Arc<dyn IdentityVerifier>;

/// Result of identity verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub identity: Identity,
    /// Produced by the development bypass; the allow-list does not apply
    pub bypassed: bool,
}

/// Extract the token from an `Authorization` header value
///
/// The scheme must be exactly `Bearer ` (a lowercase `bearer ` counts as
/// missing). The token may be empty.
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::MissingAuthHeader)
}

/// Verify the request's identity
///
/// In development mode the header is ignored and [`Identity::development`]
/// is returned without contacting the authority.
pub async fn verify_identity(
    authorization: Option<&str>,
    mode: RuntimeMode,
    verifier: Option<&dyn IdentityVerifier>,
) -> Result<Verified, AuthError> {
    if mode.is_development() {
        debug!("Development mode: identity verification bypassed");
        return Ok(Verified {
            identity: Identity::development(),
            bypassed: true,
        });
    }

    let token = extract_bearer(authorization)?;

    let Some(verifier) = verifier else {
        warn!("No identity authority configured");
        return Err(AuthError::invalid("identity authority not configured"));
    };

    let identity = verifier.verify_token(token).await?;
    debug!(
        authority = verifier.authority(),
        user_id = %identity.id,
        "Token verified"
    );

    Ok(Verified {
        identity,
        bypassed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingVerifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityVerifier for CountingVerifier {
        async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token == "good" {
                Ok(Identity::new("u1", "a@example.com", None))
            } else {
                Err(AuthError::InvalidToken { detail: None })
            }
        }

        fn authority(&self) -> &'static str {
            "test"
        }
    }

    fn verifier() -> CountingVerifier {
        CountingVerifier {
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc")), Ok("abc"));
        assert_eq!(extract_bearer(Some("Bearer ")), Ok(""));
        assert_eq!(
            extract_bearer(Some("bearer abc")),
            Err(AuthError::MissingAuthHeader)
        );
        assert_eq!(
            extract_bearer(Some("Basic abc")),
            Err(AuthError::MissingAuthHeader)
        );
        assert_eq!(extract_bearer(None), Err(AuthError::MissingAuthHeader));
    }

    #[tokio::test]
    async fn test_verify_identity_success() {
        let v = verifier();
        let verified = verify_identity(Some("Bearer good"), RuntimeMode::Production, Some(&v))
            .await
            .unwrap();
        assert_eq!(verified.identity.email, "a@example.com");
        assert!(!verified.bypassed);
        assert_eq!(v.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_header_skips_authority() {
        let v = verifier();
        let result = verify_identity(Some("bearer good"), RuntimeMode::Production, Some(&v)).await;
        assert_eq!(result, Err(AuthError::MissingAuthHeader));
        assert_eq!(v.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let v = verifier();
        let result = verify_identity(Some("Bearer bad"), RuntimeMode::Preview, Some(&v)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_development_bypass_ignores_header() {
        let v = verifier();
        let verified = verify_identity(None, RuntimeMode::Development, Some(&v))
            .await
            .unwrap();
        assert!(verified.bypassed);
        assert_eq!(verified.identity, Identity::development());
        assert_eq!(v.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_authority_is_invalid_token() {
        let result = verify_identity(Some("Bearer good"), RuntimeMode::Production, None).await;
        assert!(matches!(result, Err(AuthError::InvalidToken { .. })));
    }
}

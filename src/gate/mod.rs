//! Access gate
//!
//! Runs the origin policy, method check, allow-list configuration check,
//! identity verification and allow-list membership check for a protected
//! endpoint, in that order. Every failure is terminal and carries the HTTP
//! status and message the transport layer answers with.
//!
//! ```text
//! Start ─► preflight? ─► Done(200)
//!   └► method != POST ─► Done(405)
//!   └► allow-list unset (non-development) ─► Done(500)
//!   └► verify identity ─► Done(401 missing header | 401 invalid token)
//!   └► email not allowed ─► Done(401 not authorized)
//!   └► Authorized(identity)
//! ```

pub mod decision;

pub use decision::{AccessDecision, GateOutcome};

use crate::auth::{SharedVerifier, verify_identity};
use crate::config::{APPROVED_USERS_KEY, SharedConfigProvider, parse_allow_list, runtime_mode};
use crate::cors::OriginRules;
use crate::error::GateError;
use axum::http::{HeaderMap, Method, header};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Key reported when the identity authority has no connection info
pub const AUTHORITY_URL_KEY: &str = "SUPABASE_URL";

/// Gate for protected endpoints
///
/// Holds only read-only state; one instance serves all requests concurrently.
#[derive(Clone)]
pub struct AccessGate {
    rules: Arc<OriginRules>,
    verifier: Option<SharedVerifier>,
    config: SharedConfigProvider,
}

impl AccessGate {
    pub fn new(
        rules: Arc<OriginRules>,
        verifier: Option<SharedVerifier>,
        config: SharedConfigProvider,
    ) -> Self {
        Self {
            rules,
            verifier,
            config,
        }
    }

    /// Origin rules shared with the unprotected handlers
    pub fn origin_rules(&self) -> &Arc<OriginRules> {
        &self.rules
    }

    /// Evaluate a request against the gate
    #[instrument(skip_all, fields(method = %method))]
    pub async fn evaluate(&self, method: &Method, headers: &HeaderMap) -> GateOutcome {
        let origin = header_str(headers, header::ORIGIN);
        let cors = self.rules.evaluate(origin, method);

        if cors.terminate {
            debug!("Preflight handled");
            return GateOutcome::new(cors, AccessDecision::preflight());
        }

        let decision = match self.authorize(method, headers).await {
            Ok(decision) => decision,
            Err(err) => {
                info!(status = err.status().as_u16(), reason = %err, "Request denied");
                AccessDecision::denied(err)
            }
        };

        GateOutcome::new(cors, decision)
    }

    async fn authorize(
        &self,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<AccessDecision, GateError> {
        if *method != Method::POST {
            return Err(GateError::MethodNotAllowed);
        }

        // Read per call so configuration changes are observed without restart.
        let mode = runtime_mode(self.config.as_ref());
        let allow_list = self
            .config
            .get(APPROVED_USERS_KEY)
            .map(|raw| parse_allow_list(&raw))
            .unwrap_or_default();

        if !mode.is_development() {
            if allow_list.is_empty() {
                error!("APPROVED_USERS is empty or unset; refusing all requests");
                return Err(GateError::ConfigurationMissing {
                    key: APPROVED_USERS_KEY,
                });
            }
            if self.verifier.is_none() {
                error!("Identity authority connection info is missing");
                return Err(GateError::ConfigurationMissing {
                    key: AUTHORITY_URL_KEY,
                });
            }
        }

        let verified = verify_identity(
            header_str(headers, header::AUTHORIZATION),
            mode,
            self.verifier.as_deref(),
        )
        .await?;

        if !verified.bypassed {
            let email = verified.identity.normalized_email();
            if !allow_list.iter().any(|allowed| *allowed == email) {
                return Err(GateError::NotAuthorized);
            }
        }

        info!(user_id = %verified.identity.id, bypassed = verified.bypassed, "Request authorized");
        Ok(AccessDecision::authorized(verified.identity))
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

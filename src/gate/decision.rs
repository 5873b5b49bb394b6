//! Per-request gate results

use crate::auth::Identity;
use crate::cors::CorsDecision;
use crate::error::GateError;

/// Pass/fail result of the gate for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub identity: Option<Identity>,
    pub failure: Option<GateError>,
}

impl AccessDecision {
    pub fn authorized(identity: Identity) -> Self {
        Self {
            allowed: true,
            identity: Some(identity),
            failure: None,
        }
    }

    pub fn denied(failure: GateError) -> Self {
        Self {
            allowed: false,
            identity: None,
            failure: Some(failure),
        }
    }

    /// Preflight: not allowed to proceed, but not a failure either
    pub fn preflight() -> Self {
        Self {
            allowed: false,
            identity: None,
            failure: None,
        }
    }
}

/// Everything the transport layer needs to apply the gate's result
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub cors: CorsDecision,
    pub decision: AccessDecision,
}

impl GateOutcome {
    pub fn new(cors: CorsDecision, decision: AccessDecision) -> Self {
        Self { cors, decision }
    }
}

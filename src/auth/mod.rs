//! Authentication module
//!
//! Exchanges bearer tokens for verified identities through an external
//! authority. The gate only verifies tokens; it never issues them.

pub mod identity;
pub mod verifier;

pub use identity::{DEFAULT_ROLE, Identity};
pub use verifier::{
    BEARER_PREFIX, IdentityVerifier, SharedVerifier, Verified, extract_bearer, verify_identity,
};

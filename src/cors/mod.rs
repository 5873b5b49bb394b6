//! Cross-origin policy
//!
//! Computes CORS response headers from configured origin rules and detects
//! preflight requests.

pub mod patterns;
pub mod policy;

pub use patterns::OriginPatterns;
pub use policy::{ALLOW_HEADERS, ALLOW_METHODS, CorsDecision, OriginRules};

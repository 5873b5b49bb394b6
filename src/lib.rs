//! Unigraph API
//!
//! HTTP handlers that proxy a user-authentication provider and a
//! chat-completion provider behind simple JSON endpoints.
//!
//! ## Request gating
//!
//! Protected endpoints pass a two-stage gate before any business logic runs:
//!
//! ```text
//! origin policy → method → allow-list configured → bearer token verified → email allow-listed
//! ```
//!
//! - **Origin policy** sets `Access-Control-Allow-*` headers and answers
//!   `OPTIONS` preflights with 200
//! - **Identity verification** exchanges the `Authorization: Bearer <token>`
//!   header for a user identity at the auth provider
//! - **Allow-list** admits only approved emails (`APPROVED_USERS`)
//!
//! Every failure is answered with `{"success": false, "error": "..."}` and
//! the matching status (405, 500, 401).
//!
//! ## Example Configuration
//!
//! ```toml
//! [auth]
//! url = "https://abc.supabase.co"
//! # anon key from SUPABASE_ANON_KEY env var
//!
//! [cors]
//! allowed_origins = ["https://unigraph.app"]
//!
//! [access]
//! approved_users = "alice@example.com, bob@example.com"
//! mode = "production"
//! ```

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod gate;
pub mod server;
pub mod upstream;
pub mod util;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use gate::{AccessDecision, AccessGate};
pub use server::{AppState, router};

//! Verified user identity

use serde::{Deserialize, Serialize};

/// Role assigned when the authority does not supply one
pub const DEFAULT_ROLE: &str = "user";

/// A user identity produced by the verifier for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Option<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: role
                .filter(|r| !r.is_empty())
                .unwrap_or_else(default_role),
        }
    }

    /// The fixed identity returned by the development bypass
    pub fn development() -> Self {
        Self {
            id: "dev-user".to_string(),
            email: "dev@localhost".to_string(),
            role: "admin".to_string(),
        }
    }

    /// Email normalized for allow-list comparison
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

//! Redacting wrapper for API keys.

use serde::Deserialize;
use std::fmt;

/// A string whose value never reaches logs or error messages.
///
/// Holds the identity authority's anon key and the chat provider's API key.
/// `Debug` and `Display` print `[REDACTED]`; callers go through
/// [`SecretString::expose_secret`] when building a request header.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The underlying value, for header construction only.
    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // Best-effort only; copies made by the HTTP client are not cleared.
        self.0.clear();
        self.0.shrink_to_fit();
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}

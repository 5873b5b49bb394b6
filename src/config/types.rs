//! Configuration types for unigraph-api
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::util::SecretString;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Default port for the HTTP server
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Host-naming convention of ephemeral preview deployments
pub const DEFAULT_PREVIEW_PATTERN: &str = r"^https://unigraph-git-[a-z0-9-]+\.vercel\.app$";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Identity authority (auth provider) connection
    pub auth: AuthConfig,

    /// Chat-completion provider connection
    pub chat: ChatConfig,

    /// Cross-origin rules
    pub cors: CorsConfig,

    /// Allow-list and runtime mode
    pub access: AccessConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Identity authority configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Project URL (e.g., `https://abc.supabase.co`); from SUPABASE_URL
    pub url: Option<String>,

    /// Public anon key sent as `apikey`; from SUPABASE_ANON_KEY
    pub anon_key: Option<SecretString>,

    /// Bound on every verification and login call
    pub timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            timeout_secs: 10,
        }
    }
}

impl AuthConfig {
    /// URL and key, if both are configured and non-empty
    pub fn connection(&self) -> Option<(&str, &SecretString)> {
        let url = self.url.as_deref().filter(|u| !u.is_empty())?;
        let key = self
            .anon_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())?;
        Some((url.trim_end_matches('/'), key))
    }
}

/// Chat-completion provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Provider API key; from OPENAI_API_KEY
    pub api_key: Option<SecretString>,

    /// Model used when the request does not name one
    pub model: String,

    pub max_tokens: Option<u32>,

    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

impl ChatConfig {
    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Cross-origin configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Answer every origin with `*`
    pub allow_all: bool,

    /// Static origin allow-list, in priority order
    pub allowed_origins: Vec<String>,

    /// Regexes for preview deployment origins; echoed verbatim on match
    pub preview_patterns: Vec<String>,

    /// Auto-detected deployment host or origin (e.g., VERCEL_URL)
    pub deployment_url: Option<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_all: false,
            allowed_origins: Vec::new(),
            preview_patterns: vec![DEFAULT_PREVIEW_PATTERN.to_string()],
            deployment_url: None,
        }
    }
}

/// Allow-list and runtime mode as loaded at startup
///
/// The gate does not read these fields directly; they seed the
/// [`crate::config::ConfigProvider`] it queries on every request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Comma-separated approved emails
    pub approved_users: Option<String>,

    pub mode: RuntimeMode,
}

/// Deployment runtime mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Local development: identity verification is bypassed
    #[serde(alias = "dev")]
    Development,
    /// Ephemeral preview deployment
    Preview,
    /// Anything else; the fail-closed default
    #[default]
    #[serde(alias = "prod")]
    Production,
}

impl RuntimeMode {
    /// Parse a mode value, treating anything unrecognised as production
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(RuntimeMode::Production)
    }

    pub fn is_development(self) -> bool {
        self == RuntimeMode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Preview => "preview",
            RuntimeMode::Production => "production",
        }
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeMode::Development),
            "preview" => Ok(RuntimeMode::Preview),
            "production" | "prod" => Ok(RuntimeMode::Production),
            other => Err(format!("unknown runtime mode '{}'", other)),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, DEFAULT_HTTP_PORT);
        assert_eq!(config.auth.timeout_secs, 10);
        assert_eq!(config.access.mode, RuntimeMode::Production);
        assert!(!config.cors.allow_all);
        assert_eq!(config.cors.preview_patterns, vec![DEFAULT_PREVIEW_PATTERN]);
    }

    #[test]
    fn test_completions_url() {
        let config = ChatConfig {
            base_url: "https://llm.example.com/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.completions_url(),
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_auth_connection_requires_both_parts() {
        let config = AuthConfig {
            url: Some("https://abc.supabase.co/".to_string()),
            anon_key: None,
            ..Default::default()
        };
        assert!(config.connection().is_none());

        let config = AuthConfig {
            url: Some("https://abc.supabase.co/".to_string()),
            anon_key: Some(SecretString::new("anon")),
            ..Default::default()
        };
        let (url, key) = config.connection().unwrap();
        assert_eq!(url, "https://abc.supabase.co");
        assert_eq!(key.expose_secret(), "anon");

        let config = AuthConfig {
            url: Some(String::new()),
            anon_key: Some(SecretString::new("anon")),
            ..Default::default()
        };
        assert!(config.connection().is_none());
    }

    #[test]
    fn test_runtime_mode_parsing() {
        assert_eq!(
            RuntimeMode::parse_lenient(Some("Development")),
            RuntimeMode::Development
        );
        assert_eq!(
            RuntimeMode::parse_lenient(Some(" preview ")),
            RuntimeMode::Preview
        );
        assert_eq!(
            RuntimeMode::parse_lenient(Some("staging")),
            RuntimeMode::Production
        );
        assert_eq!(RuntimeMode::parse_lenient(None), RuntimeMode::Production);
    }

    #[test]
    fn test_deserialize_runtime_mode() {
        let mode: RuntimeMode = serde_json::from_str(r#""preview""#).unwrap();
        assert_eq!(mode, RuntimeMode::Preview);

        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}

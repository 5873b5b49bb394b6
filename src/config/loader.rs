//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (UNIGRAPH__SECTION__KEY)
//! 2. Well-known platform variables (SUPABASE_URL, OPENAI_API_KEY, VERCEL_URL, ...)
//! 3. Configuration file (TOML)
//! 4. Default values

use crate::config::provider::{ENV_PREFIX, prefixed_var};
use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "unigraph-api.toml",
    ".unigraph-api.toml",
    "~/.config/unigraph-api/config.toml",
];

/// Flat variables set by hosting platforms, mapped onto config keys.
/// Earlier entries win when several map to the same key.
const PLATFORM_ENV_VARS: &[(&str, &str)] = &[
    ("SUPABASE_URL", "auth.url"),
    ("SUPABASE_ANON_KEY", "auth.anon_key"),
    ("OPENAI_API_KEY", "chat.api_key"),
    ("OPENAI_MODEL", "chat.model"),
    ("CORS_ALLOW_ALL", "cors.allow_all"),
    ("DEPLOYMENT_URL", "cors.deployment_url"),
    ("VERCEL_URL", "cors.deployment_url"),
    ("APPROVED_USERS", "access.approved_users"),
    ("APP_ENV", "access.mode"),
    ("VERCEL_ENV", "access.mode"),
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Platform variables
    builder = apply_platform_env(builder)?;

    // 4. Add environment variables with UNIGRAPH__ prefix
    // e.g., UNIGRAPH__SERVER__PORT, UNIGRAPH__CORS__ALLOWED_ORIGINS
    // Double underscore (__) maps to nested keys (server.port)
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("cors.allowed_origins")
            .with_list_parse_key("cors.preview_patterns")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Map flat platform variables onto their config keys
///
/// Keys already set through a prefixed variable are left alone so the
/// prefixed form keeps precedence over the platform one.
fn apply_platform_env(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut seen: Vec<&str> = Vec::new();

    for (var, key) in PLATFORM_ENV_VARS {
        if seen.contains(key) || std::env::var_os(prefixed_var(key)).is_some() {
            continue;
        }
        let Ok(value) = std::env::var(var) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }

        builder = match *key {
            "cors.allow_all" => builder.set_override(*key, parse_flag(&value)),
            _ => builder.set_override(*key, value),
        }
        .map_err(|e| ConfigError::Load(e.to_string()))?;
        seen.push(*key);
    }

    if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS")
        && std::env::var_os(prefixed_var("cors.allowed_origins")).is_none()
    {
        let origins: Vec<String> = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        builder = builder
            .set_override("cors.allowed_origins", origins)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    Ok(builder)
}

/// Truthy strings accepted for boolean flags
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(url) = config.auth.url.as_deref()
        && !url.is_empty()
    {
        validate_url(url, "auth.url")?;
    }

    validate_url(&config.chat.base_url, "chat.base_url")?;

    if config.auth.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "auth.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.chat.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "chat.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.chat.model.is_empty() {
        return Err(ConfigError::Missing {
            field: "chat.model".to_string(),
        });
    }

    validate_patterns(&config.cors.preview_patterns, "cors.preview_patterns")?;

    Ok(())
}

fn validate_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            message: format!("{} must start with http:// or https://, got: {}", field, url),
        })
    }
}

/// Validate that all patterns are valid regex
fn validate_patterns(patterns: &[String], field_path: &str) -> Result<(), ConfigError> {
    for pattern in patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: format!("in {}: {}", field_path, e),
            });
        }
    }
    Ok(())
}

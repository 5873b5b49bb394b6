//! Call-time configuration lookup
//!
//! The access gate re-reads the allow-list and runtime mode on every request
//! through a [`ConfigProvider`], so a changed environment (or a swapped
//! provider in tests) is observed without restarting the process.

use crate::config::types::{AppConfig, RuntimeMode};
use std::collections::HashMap;
use std::sync::Arc;

/// Environment key holding the comma-separated approved emails
pub const APPROVED_USERS_KEY: &str = "APPROVED_USERS";

/// Environment key holding the runtime mode
pub const APP_ENV_KEY: &str = "APP_ENV";

/// Prefix of the structured environment variables
pub const ENV_PREFIX: &str = "UNIGRAPH";

/// Call-time keys and the config keys they shadow
const CALL_TIME_KEYS: &[(&str, &str)] = &[
    (APPROVED_USERS_KEY, "access.approved_users"),
    (APP_ENV_KEY, "access.mode"),
];

/// Structured variable name for a config key (`auth.url` -> `UNIGRAPH__AUTH__URL`)
pub fn prefixed_var(key: &str) -> String {
    format!("{}__{}", ENV_PREFIX, key.replace('.', "__").to_uppercase())
}

/// Key/value configuration source
pub trait ConfigProvider: Send + Sync {
    /// Current value for `key`, if set
    fn get(&self, key: &str) -> Option<String>;
}

/// Shared provider handle
pub type SharedConfigProvider = Arc<dyn ConfigProvider>;

/// Reads the process environment on every call
///
/// Resolves call-time keys with the loader's precedence: the prefixed
/// variable (`UNIGRAPH__ACCESS__MODE`) wins over the flat one (`APP_ENV`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        let prefixed = CALL_TIME_KEYS
            .iter()
            .find(|(flat, _)| *flat == key)
            .and_then(|(_, config_key)| non_empty_var(&prefixed_var(config_key)));

        prefixed.or_else(|| non_empty_var(key))
    }
}

/// Fixed in-memory values
#[derive(Debug, Clone, Default)]
pub struct MapProvider {
    values: HashMap<String, String>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Expose the call-time keys of a loaded configuration
    pub fn from_config(config: &AppConfig) -> Self {
        let mut provider = Self::new().with(APP_ENV_KEY, config.access.mode.as_str());
        if let Some(users) = &config.access.approved_users {
            provider = provider.with(APPROVED_USERS_KEY, users.clone());
        }
        provider
    }
}

impl ConfigProvider for MapProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Queries providers in order; the first one with a value wins
#[derive(Clone, Default)]
pub struct LayeredProvider {
    layers: Vec<SharedConfigProvider>,
}

impl LayeredProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-precedence layer
    pub fn layer(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.layers.push(Arc::new(provider));
        self
    }
}

impl ConfigProvider for LayeredProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|p| p.get(key))
    }
}

/// Blank values count as unset, as they do for the loader
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Provider consulted by the gate on every request
///
/// Live environment first, then the values the configuration was loaded with.
pub fn request_provider(config: &AppConfig) -> LayeredProvider {
    LayeredProvider::new()
        .layer(EnvProvider)
        .layer(MapProvider::from_config(config))
}

/// Runtime mode as currently configured
pub fn runtime_mode(provider: &dyn ConfigProvider) -> RuntimeMode {
    RuntimeMode::parse_lenient(provider.get(APP_ENV_KEY).as_deref())
}

/// Parse a comma-separated allow-list into normalized emails
///
/// Entries are trimmed and lowercased; blanks are dropped.
pub fn parse_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

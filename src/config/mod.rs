//! Configuration module
//!
//! Handles loading and validating configuration from TOML files and environment variables,
//! and the call-time provider the access gate reads from.

pub mod loader;
pub mod provider;
pub mod types;

pub use loader::{load_config, load_config_from_str};
pub use provider::{
    APP_ENV_KEY, APPROVED_USERS_KEY, ConfigProvider, ENV_PREFIX, EnvProvider, LayeredProvider,
    MapProvider, SharedConfigProvider, parse_allow_list, prefixed_var, request_provider,
    runtime_mode,
};
pub use types::*;

//! Shared handler state

use crate::auth::SharedVerifier;
use crate::config::{AppConfig, SharedConfigProvider};
use crate::cors::OriginRules;
use crate::error::AppError;
use crate::gate::AccessGate;
use crate::upstream::{ChatClient, SupabaseClient};
use std::sync::Arc;
use tracing::{info, warn};

/// State shared by every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub gate: AccessGate,
    pub rules: Arc<OriginRules>,
    pub auth: Option<Arc<SupabaseClient>>,
    pub chat: Option<Arc<ChatClient>>,
    pub config: SharedConfigProvider,
}

impl AppState {
    /// Build the state from loaded configuration
    ///
    /// `provider` is queried on every request for the allow-list and
    /// runtime mode.
    pub fn from_config(config: &AppConfig, provider: SharedConfigProvider) -> Result<Self, AppError> {
        let rules = Arc::new(OriginRules::new(&config.cors, config.access.mode)?);

        let auth = SupabaseClient::from_config(&config.auth)?.map(Arc::new);
        if auth.is_none() {
            warn!("Identity authority not configured (SUPABASE_URL / SUPABASE_ANON_KEY)");
        }

        let chat = ChatClient::from_config(&config.chat)?.map(Arc::new);
        if chat.is_none() {
            warn!("Chat provider not configured (OPENAI_API_KEY)");
        }

        info!(
            allow_all = config.cors.allow_all,
            origins = rules.allowed_origins().len(),
            "Origin rules loaded"
        );

        let verifier = auth.clone().map(|client| client as SharedVerifier);
        let gate = AccessGate::new(rules.clone(), verifier, provider.clone());

        Ok(Self {
            gate,
            rules,
            auth,
            chat,
            config: provider,
        })
    }

    /// State with explicit parts (used by tests and embedders)
    pub fn new(
        rules: Arc<OriginRules>,
        auth: Option<Arc<SupabaseClient>>,
        verifier: Option<SharedVerifier>,
        chat: Option<Arc<ChatClient>>,
        config: SharedConfigProvider,
    ) -> Self {
        let gate = AccessGate::new(rules.clone(), verifier, config.clone());
        Self {
            gate,
            rules,
            auth,
            chat,
            config,
        }
    }
}

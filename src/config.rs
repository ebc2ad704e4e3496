//! Client configuration.
//!
//! Use the builder pattern, or [`ClientConfig::from_env`] to pick up the
//! `RAGCHAT_*` environment variables.

use crate::client::{ApiClient, DEFAULT_BASE_URL};

/// Configuration for the backend client.
///
/// # Example
///
/// ```ignore
/// use ragchat::config::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_base_url("https://support.example.com")
///     .with_token("secret");
/// let client = config.build_client();
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API
    pub base_url: String,
    /// Bearer token; without one, send attempts are silently ignored
    pub token: Option<String>,
    /// Bot to route conversations to
    pub bot_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            bot_id: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_bot_id(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = Some(bot_id.into());
        self
    }

    /// Read configuration from `RAGCHAT_API_URL`, `RAGCHAT_TOKEN` and
    /// `RAGCHAT_BOT_ID`. Unset variables fall back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("RAGCHAT_API_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(token) = std::env::var("RAGCHAT_TOKEN") {
            if !token.is_empty() {
                config.token = Some(token);
            }
        }
        if let Ok(bot_id) = std::env::var("RAGCHAT_BOT_ID") {
            if !bot_id.is_empty() {
                config.bot_id = Some(bot_id);
            }
        }
        config
    }

    /// Build an [`ApiClient`] from this configuration.
    pub fn build_client(&self) -> ApiClient {
        let client = ApiClient::with_url(&self.base_url);
        match &self.token {
            Some(token) => client.with_auth(token),
            None => client,
        }
    }
}

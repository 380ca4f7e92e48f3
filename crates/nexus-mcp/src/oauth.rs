//! OAuth plumbing contracts for authorized MCP transports.
//!
//! Nexus speaks Authorization Code + PKCE as a public client
//! (`token_endpoint_auth_method=none`). The HTTP callback listener and
//! the browser redirect live with the frontend; this module holds the
//! pieces the client itself owns: client metadata, pluggable token
//! storage, and the callback state that MUST be reset before each flow
//! so a stale authorization code is never reused.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Default port for the local OAuth redirect listener.
pub const DEFAULT_CALLBACK_PORT: u16 = 3030;

/// OAuth client metadata for dynamic registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    /// Client display name.
    pub client_name: String,
    /// Redirect URIs the authorization server may use.
    pub redirect_uris: Vec<String>,
    /// Allowed grant types.
    pub grant_types: Vec<String>,
    /// Allowed response types.
    pub response_types: Vec<String>,
    /// Token endpoint auth method; `none` for a public client with PKCE.
    pub token_endpoint_auth_method: String,
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self {
            client_name: "Nexus MCP Client".to_string(),
            redirect_uris: vec![format!("http://localhost:{DEFAULT_CALLBACK_PORT}/callback")],
            grant_types: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
        }
    }
}

/// A stored token set for one authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Bearer access token.
    pub access_token: String,
    /// Refresh token, when issued.
    pub refresh_token: Option<String>,
    /// Token type; effectively always `Bearer`.
    pub token_type: String,
}

/// Pluggable storage for OAuth tokens.
///
/// The default is in-memory; persistent backends implement the same
/// trait.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Load tokens for a server URL.
    async fn get_tokens(&self, server_url: &str) -> Option<OAuthTokens>;

    /// Store tokens for a server URL.
    async fn set_tokens(&self, server_url: &str, tokens: OAuthTokens);

    /// Drop tokens for a server URL.
    async fn clear_tokens(&self, server_url: &str);
}

/// In-memory token storage. Tokens are lost on process exit.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    tokens: Mutex<HashMap<String, OAuthTokens>>,
}

impl InMemoryTokenStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn get_tokens(&self, server_url: &str) -> Option<OAuthTokens> {
        self.tokens
            .lock()
            .expect("lock poisoned")
            .get(server_url)
            .cloned()
    }

    async fn set_tokens(&self, server_url: &str, tokens: OAuthTokens) {
        debug!(server_url = %server_url, "Storing OAuth tokens");
        self.tokens
            .lock()
            .expect("lock poisoned")
            .insert(server_url.to_string(), tokens);
    }

    async fn clear_tokens(&self, server_url: &str) {
        self.tokens.lock().expect("lock poisoned").remove(server_url);
    }
}

/// State captured by the OAuth redirect callback.
///
/// The frontend's callback listener writes into this; the authorization
/// flow reads the code out exactly once. `reset()` MUST be called before
/// each new flow so a stale code from a previous flow cannot be reused.
#[derive(Debug, Default)]
pub struct OAuthCallbackState {
    inner: Mutex<CallbackData>,
}

#[derive(Debug, Default, Clone)]
struct CallbackData {
    authorization_code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl OAuthCallbackState {
    /// Create empty callback state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset before a fresh OAuth flow.
    pub fn reset(&self) {
        info!("Resetting OAuth callback state for fresh flow");
        *self.inner.lock().expect("lock poisoned") = CallbackData::default();
    }

    /// Record a successful callback.
    pub fn record_success(&self, code: impl Into<String>, state: Option<String>) {
        let mut data = self.inner.lock().expect("lock poisoned");
        data.authorization_code = Some(code.into());
        data.state = state;
        data.error = None;
    }

    /// Record a failed callback.
    pub fn record_error(&self, error: impl Into<String>) {
        let mut data = self.inner.lock().expect("lock poisoned");
        data.error = Some(error.into());
    }

    /// Take the authorization code, clearing it so it cannot be reused.
    #[must_use]
    pub fn take_authorization_code(&self) -> Option<String> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .authorization_code
            .take()
    }

    /// The `state` parameter from the last callback.
    #[must_use]
    pub fn state(&self) -> Option<String> {
        self.inner.lock().expect("lock poisoned").state.clone()
    }

    /// The error from the last callback, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.lock().expect("lock poisoned").error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_storage_roundtrip() {
        let storage = InMemoryTokenStorage::new();
        let tokens = OAuthTokens {
            access_token: "abc".to_string(),
            refresh_token: Some("def".to_string()),
            token_type: "Bearer".to_string(),
        };

        assert!(storage.get_tokens("https://a.example").await.is_none());
        storage.set_tokens("https://a.example", tokens.clone()).await;
        assert_eq!(storage.get_tokens("https://a.example").await, Some(tokens));

        storage.clear_tokens("https://a.example").await;
        assert!(storage.get_tokens("https://a.example").await.is_none());
    }

    #[test]
    fn test_callback_code_is_single_use() {
        let state = OAuthCallbackState::new();
        state.record_success("code-1", Some("xyz".to_string()));

        assert_eq!(state.take_authorization_code(), Some("code-1".to_string()));
        // Second take must not see a stale code
        assert_eq!(state.take_authorization_code(), None);
        assert_eq!(state.state(), Some("xyz".to_string()));
    }

    #[test]
    fn test_reset_clears_stale_state() {
        let state = OAuthCallbackState::new();
        state.record_success("stale-code", None);
        state.record_error("denied");

        state.reset();

        assert_eq!(state.take_authorization_code(), None);
        assert_eq!(state.error(), None);
        assert_eq!(state.state(), None);
    }

    #[test]
    fn test_default_client_config_is_public_pkce() {
        let config = OAuthClientConfig::default();
        assert_eq!(config.token_endpoint_auth_method, "none");
        assert!(config
            .grant_types
            .iter()
            .any(|g| g == "authorization_code"));
        assert!(config.grant_types.iter().any(|g| g == "refresh_token"));
        assert!(config.redirect_uris[0].contains("localhost:3030/callback"));
    }
}

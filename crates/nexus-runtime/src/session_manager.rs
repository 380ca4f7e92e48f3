//! Session lifecycle and persistence.
//!
//! Single-session today, shaped for multi-session later: the manager
//! restores the default session from its state provider on startup and
//! snapshots it back on save. Corrupt snapshots are never resurrected
//! as partial state — they log loudly and a fresh session takes over.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use nexus_storage::StateProvider;

use crate::conversation::Conversation;
use crate::error::{RuntimeError, RuntimeResult};
use crate::session::{Agent, Session, SessionMetadata, SessionSnapshot};

/// Storage key for the default session.
const DEFAULT_SESSION_KEY: &str = "session:default";
/// Session id of the default session.
const DEFAULT_SESSION_ID: &str = "default";

/// Defaults applied when creating a fresh session.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    /// Model recorded in the metadata.
    pub model: String,
    /// System preamble for new conversations.
    pub system_message: Option<String>,
    /// Whether prompt caching is requested.
    pub enable_caching: bool,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_message: None,
            enable_caching: true,
        }
    }
}

/// Manages the active session and its persistence.
pub struct SessionManager {
    provider: Arc<dyn StateProvider>,
    defaults: SessionDefaults,
    active: Option<Session>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("has_active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager over a state provider.
    #[must_use]
    pub fn new(provider: Arc<dyn StateProvider>, defaults: SessionDefaults) -> Self {
        Self {
            provider,
            defaults,
            active: None,
        }
    }

    /// Get the active session, restoring from storage or creating a
    /// fresh one.
    ///
    /// Restore failures — missing state, I/O errors, corrupt JSON —
    /// all fall back to a new session; corruption is logged loudly.
    /// The agent is rebuilt from fresh infrastructure via `make_agent`
    /// in every path.
    pub async fn get_or_create_default_session<F>(&mut self, make_agent: F) -> &mut Session
    where
        F: Fn(Arc<tokio::sync::Mutex<Conversation>>) -> Arc<dyn Agent>,
    {
        if self.active.is_some() {
            // Already resolved this process lifetime
            return self.active.as_mut().expect("checked above");
        }

        let restored = match self.provider.load(DEFAULT_SESSION_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<SessionSnapshot>(value) {
                Ok(snapshot) => {
                    info!(
                        session_id = %snapshot.metadata.session_id,
                        messages = snapshot.conversation.message_count(),
                        "Session restored from storage"
                    );
                    Some(Session::from_snapshot(snapshot, &make_agent))
                },
                Err(e) => {
                    error!(error = %e, "Corrupt session snapshot, creating a new session");
                    None
                },
            },
            Ok(None) => {
                info!("No stored session, creating a new one");
                None
            },
            Err(e) => {
                error!(error = %e, "Failed to load session state, creating a new session");
                None
            },
        };

        let session = restored.unwrap_or_else(|| self.create_new_session(&make_agent));
        self.active = Some(session);
        self.active.as_mut().expect("just set")
    }

    fn create_new_session<F>(&self, make_agent: &F) -> Session
    where
        F: Fn(Arc<tokio::sync::Mutex<Conversation>>) -> Arc<dyn Agent>,
    {
        let metadata = SessionMetadata::new(DEFAULT_SESSION_ID, self.defaults.model.clone());
        let conversation = Arc::new(Mutex::new(Conversation::new(
            self.defaults.system_message.clone(),
            self.defaults.enable_caching,
        )));
        let agent = make_agent(Arc::clone(&conversation));
        info!(session_id = DEFAULT_SESSION_ID, "Created new session");
        Session::new(metadata, conversation, agent)
    }

    /// The active session, if one has been resolved.
    #[must_use]
    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// Mutable access to the active session.
    #[must_use]
    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        self.active.as_mut()
    }

    /// Persist the active session.
    ///
    /// # Errors
    ///
    /// Storage failures propagate — the system continues in-memory, but
    /// the caller learns the snapshot did not land.
    pub async fn save_active_session(&self) -> RuntimeResult<()> {
        let Some(session) = &self.active else {
            warn!("No active session to save");
            return Ok(());
        };

        let snapshot = session.snapshot().await;
        let value = serde_json::to_value(&snapshot)
            .map_err(|e| RuntimeError::Serialization(e.to_string()))?;

        self.provider.save(DEFAULT_SESSION_KEY, &value).await?;
        info!(session_id = %session.session_id(), "Session saved");
        Ok(())
    }

    /// Clear the active session's history, preserving metadata.
    pub async fn clear_active_session_history(&mut self) {
        if let Some(session) = &mut self.active {
            session.clear_history().await;
            info!(session_id = %session.session_id(), "Session history cleared");
        }
    }
}

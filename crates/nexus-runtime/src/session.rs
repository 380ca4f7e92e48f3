//! Sessions: a durable (metadata, conversation) pair plus a live agent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::conversation::Conversation;
use crate::error::RuntimeResult;
use crate::observer::ExecutionObserver;

fn default_title() -> String {
    "New Conversation".to_string()
}

/// Metadata identifying and describing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Unique session identifier.
    pub session_id: String,
    /// Display title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last activity time. Never precedes `created_at`.
    pub last_active_at: DateTime<Utc>,
    /// User-defined tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Model the session runs on.
    #[serde(default)]
    pub model: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl SessionMetadata {
    /// Fresh metadata for a new session.
    pub fn new(session_id: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            title: default_title(),
            created_at: now,
            last_active_at: now,
            tags: Vec::new(),
            model: model.into(),
            description: None,
        }
    }

    /// Bump the activity timestamp.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

/// The persisted form of a session: metadata plus conversation. The
/// agent is never persisted; it is reconstructed with fresh
/// infrastructure at restore time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session metadata.
    pub metadata: SessionMetadata,
    /// The conversation history.
    pub conversation: Conversation,
}

/// The query-execution facade a session delegates to.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute a query and return the final response text.
    async fn run(&self, query: &str, observer: &dyn ExecutionObserver) -> RuntimeResult<String>;
}

/// A live session: metadata, conversation, and the agent facade.
pub struct Session {
    /// Session metadata.
    pub metadata: SessionMetadata,
    conversation: Arc<Mutex<Conversation>>,
    agent: Arc<dyn Agent>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.metadata.session_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session over an existing conversation and agent.
    #[must_use]
    pub fn new(
        metadata: SessionMetadata,
        conversation: Arc<Mutex<Conversation>>,
        agent: Arc<dyn Agent>,
    ) -> Self {
        debug!(session_id = %metadata.session_id, "Session initialized");
        Self {
            metadata,
            conversation,
            agent,
        }
    }

    /// Restore a session from a snapshot, attaching a freshly built
    /// agent via the factory.
    pub fn from_snapshot<F>(snapshot: SessionSnapshot, make_agent: F) -> Self
    where
        F: FnOnce(Arc<Mutex<Conversation>>) -> Arc<dyn Agent>,
    {
        let conversation = Arc::new(Mutex::new(snapshot.conversation));
        let agent = make_agent(Arc::clone(&conversation));
        Self::new(snapshot.metadata, conversation, agent)
    }

    /// The session id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.metadata.session_id
    }

    /// Shared handle to the conversation.
    #[must_use]
    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    /// Number of messages in the conversation.
    pub async fn message_count(&self) -> usize {
        self.conversation.lock().await.message_count()
    }

    /// Rough token estimate for the conversation.
    pub async fn token_estimate(&self) -> usize {
        self.conversation.lock().await.token_estimate()
    }

    /// Execute a query through the agent, bumping `last_active_at`.
    ///
    /// # Errors
    ///
    /// Propagates agent failures.
    pub async fn run_query(
        &mut self,
        query: &str,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        self.metadata.touch();
        let result = self.agent.run(query, observer).await?;
        debug!(
            session_id = %self.metadata.session_id,
            chars = result.len(),
            "Session query completed"
        );
        Ok(result)
    }

    /// Clear the conversation history, preserving metadata.
    pub async fn clear_history(&mut self) {
        self.conversation.lock().await.clear();
        self.metadata.touch();
    }

    /// Snapshot the persistable parts of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            metadata: self.metadata.clone(),
            conversation: self.conversation.lock().await.clone(),
        }
    }
}

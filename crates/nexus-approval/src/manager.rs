//! Approval manager: the request/response rendezvous.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApprovalError, ApprovalResult};
use crate::request::{ApprovalKind, ApprovalRequest, ApprovalResponse};

/// Configuration for the approval system.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    /// Global enable/disable. When disabled, every request auto-approves.
    pub enabled: bool,
    /// Request approval for query complexity analyses.
    pub require_query_analysis_approval: bool,
    /// Request approval for tool executions.
    pub require_tool_approval: bool,
    /// Tools that never require approval.
    pub tool_whitelist: HashSet<String>,
    /// Auto-approve analyses classified SIMPLE.
    pub auto_approve_simple_queries: bool,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_query_analysis_approval: false,
            require_tool_approval: false,
            tool_whitelist: HashSet::new(),
            auto_approve_simple_queries: true,
        }
    }
}

/// UI side of the rendezvous.
///
/// The frontend registers an implementation; `present` SHOULD display
/// the request and eventually cause `submit_response` to be called.
/// Presentation is scheduled on its own task so a slow UI never blocks
/// the requesting agent beyond its own await.
#[async_trait]
pub trait ApprovalUi: Send + Sync {
    /// Display an approval request to the user.
    async fn present(&self, request: ApprovalRequest);
}

struct PendingEntry {
    tx: oneshot::Sender<ApprovalResponse>,
    request: ApprovalRequest,
}

/// Manages the approval request/response lifecycle.
///
/// Agent code calls [`request_approval`](Self::request_approval) and
/// suspends; the UI calls [`submit_response`](Self::submit_response)
/// with the matching request id. Session memory short-circuits repeat
/// requests when the user asked for their decision to be remembered.
pub struct ApprovalManager {
    config: ApprovalConfig,
    ui: Mutex<Option<Arc<dyn ApprovalUi>>>,
    pending: Mutex<HashMap<Uuid, PendingEntry>>,
    remembered_tools: Mutex<HashMap<String, bool>>,
    remembered_query_analysis: Mutex<Option<bool>>,
}

impl std::fmt::Debug for ApprovalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.pending.lock().map(|p| p.len()).unwrap_or_default();
        f.debug_struct("ApprovalManager")
            .field("enabled", &self.config.enabled)
            .field("pending", &pending)
            .finish_non_exhaustive()
    }
}

impl ApprovalManager {
    /// Create a manager with the given configuration.
    #[must_use]
    pub fn new(config: ApprovalConfig) -> Self {
        Self {
            config,
            ui: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            remembered_tools: Mutex::new(HashMap::new()),
            remembered_query_analysis: Mutex::new(None),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    /// Register the UI callback.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_ui(&self, ui: Arc<dyn ApprovalUi>) {
        *self.ui.lock().expect("lock poisoned") = Some(ui);
    }

    /// Whether a tool is whitelisted (never prompts).
    #[must_use]
    pub fn is_whitelisted(&self, tool_name: &str) -> bool {
        self.config.tool_whitelist.contains(tool_name)
    }

    /// Request user approval and suspend until a response arrives.
    ///
    /// Resolution order:
    /// 1. Approvals disabled → auto-approve with `auto_approved=true`.
    /// 2. A remembered session decision → short-circuit with
    ///    `remembered=true`.
    /// 3. Otherwise the UI is invoked and the caller suspends until
    ///    [`submit_response`](Self::submit_response) or
    ///    [`cancel_request`](Self::cancel_request).
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NoUiRegistered`] when no UI callback is
    /// set, and [`ApprovalError::Abandoned`] if the pending entry is
    /// dropped without a response.
    pub async fn request_approval(
        &self,
        request: ApprovalRequest,
    ) -> ApprovalResult<ApprovalResponse> {
        if !self.config.enabled {
            debug!(request_id = %request.id, "Approvals disabled, auto-approving");
            return Ok(ApprovalResponse {
                request_id: request.id,
                approved: true,
                selected_option: request.default_option.clone(),
                metadata: {
                    let mut m = serde_json::Map::new();
                    m.insert("auto_approved".to_string(), Value::Bool(true));
                    m
                },
            });
        }

        if let Some(response) = self.remembered_response(&request) {
            debug!(request_id = %request.id, "Resolved from session memory");
            return Ok(response);
        }

        let ui = self
            .ui
            .lock()
            .expect("lock poisoned")
            .clone()
            .ok_or(ApprovalError::NoUiRegistered)?;

        let (tx, rx) = oneshot::channel();
        let request_id = request.id;
        {
            let mut pending = self.pending.lock().expect("lock poisoned");
            pending.insert(
                request_id,
                PendingEntry {
                    tx,
                    request: request.clone(),
                },
            );
        }

        info!(request_id = %request_id, kind = ?request.kind, title = %request.title, "Requesting approval");

        // Presentation runs on its own task; the caller only awaits the
        // response channel.
        tokio::spawn(async move {
            ui.present(request).await;
        });

        rx.await.map_err(|_| ApprovalError::Abandoned(request_id))
    }

    /// Submit the user's response to a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::UnknownRequest`] when no pending request
    /// matches the response's id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn submit_response(&self, response: ApprovalResponse) -> ApprovalResult<()> {
        let entry = {
            let mut pending = self.pending.lock().expect("lock poisoned");
            pending
                .remove(&response.request_id)
                .ok_or(ApprovalError::UnknownRequest(response.request_id))?
        };

        if response.wants_remembering() {
            self.remember(&entry.request, response.approved);
        }

        debug!(request_id = %response.request_id, approved = response.approved, "Approval response submitted");
        // A dropped receiver just means the requester went away
        let _ = entry.tx.send(response);
        Ok(())
    }

    /// Cancel a pending request. The waiting caller receives
    /// `approved=false` with `cancelled=true` metadata. No-op for
    /// unknown ids.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn cancel_request(&self, request_id: Uuid, reason: &str) {
        let entry = {
            let mut pending = self.pending.lock().expect("lock poisoned");
            pending.remove(&request_id)
        };

        if let Some(entry) = entry {
            warn!(request_id = %request_id, reason, "Approval request cancelled");
            let mut metadata = serde_json::Map::new();
            metadata.insert("cancelled".to_string(), Value::Bool(true));
            metadata.insert("reason".to_string(), Value::String(reason.to_string()));
            let _ = entry.tx.send(ApprovalResponse {
                request_id,
                approved: false,
                selected_option: "Cancel".to_string(),
                metadata,
            });
        }
    }

    /// Cancel every pending request.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn cancel_all(&self, reason: &str) {
        let ids: Vec<Uuid> = {
            let pending = self.pending.lock().expect("lock poisoned");
            pending.keys().copied().collect()
        };
        for id in ids {
            self.cancel_request(id, reason);
        }
    }

    /// Whether any requests are waiting for a response.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn has_pending_requests(&self) -> bool {
        !self.pending.lock().expect("lock poisoned").is_empty()
    }

    /// Clear all remembered decisions for this session.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear_session_memory(&self) {
        self.remembered_tools.lock().expect("lock poisoned").clear();
        *self
            .remembered_query_analysis
            .lock()
            .expect("lock poisoned") = None;
        debug!("Approval session memory cleared");
    }

    /// The remembered decision for a tool, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn remembered_tool_decision(&self, tool_name: &str) -> Option<bool> {
        self.remembered_tools
            .lock()
            .expect("lock poisoned")
            .get(tool_name)
            .copied()
    }

    fn remember(&self, request: &ApprovalRequest, approved: bool) {
        match request.kind {
            ApprovalKind::QueryAnalysis => {
                *self
                    .remembered_query_analysis
                    .lock()
                    .expect("lock poisoned") = Some(approved);
            },
            ApprovalKind::ToolExecution => {
                if let Some(tool_name) = request.tool_name() {
                    self.remembered_tools
                        .lock()
                        .expect("lock poisoned")
                        .insert(tool_name.to_string(), approved);
                }
            },
        }
        debug!(kind = ?request.kind, approved, "Decision remembered for session");
    }

    fn remembered_response(&self, request: &ApprovalRequest) -> Option<ApprovalResponse> {
        let approved = match request.kind {
            ApprovalKind::QueryAnalysis => {
                (*self.remembered_query_analysis.lock().expect("lock poisoned"))?
            },
            ApprovalKind::ToolExecution => {
                let tool_name = request.tool_name()?;
                self.remembered_tool_decision(tool_name)?
            },
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("remembered".to_string(), Value::Bool(true));
        Some(ApprovalResponse {
            request_id: request.id,
            approved,
            selected_option: if approved { "Approve" } else { "Deny" }.to_string(),
            metadata,
        })
    }
}

impl Default for ApprovalManager {
    fn default() -> Self {
        Self::new(ApprovalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    /// UI that immediately submits a fixed decision back to the manager.
    struct InstantUi {
        manager: std::sync::Weak<ApprovalManager>,
        approve: bool,
        remember: bool,
    }

    #[async_trait]
    impl ApprovalUi for InstantUi {
        async fn present(&self, request: ApprovalRequest) {
            let Some(manager) = self.manager.upgrade() else {
                return;
            };
            let mut response = if self.approve {
                ApprovalResponse::approve(request.id)
            } else {
                ApprovalResponse::deny(request.id)
            };
            if self.remember {
                response = response.remember_for_session();
            }
            manager.submit_response(response).unwrap();
        }
    }

    /// UI that never responds.
    struct SilentUi;

    #[async_trait]
    impl ApprovalUi for SilentUi {
        async fn present(&self, _request: ApprovalRequest) {}
    }

    fn tool_request(tool: &str) -> ApprovalRequest {
        let mut details = Map::new();
        details.insert("tool_name".to_string(), Value::String(tool.to_string()));
        ApprovalRequest::tool_execution(format!("Run {tool}?"), details)
    }

    fn manager_with_ui(approve: bool, remember: bool) -> Arc<ApprovalManager> {
        let manager = Arc::new(ApprovalManager::default());
        let ui = InstantUi {
            manager: Arc::downgrade(&manager),
            approve,
            remember,
        };
        manager.set_ui(Arc::new(ui));
        manager
    }

    #[tokio::test]
    async fn test_disabled_auto_approves() {
        let manager = ApprovalManager::new(ApprovalConfig {
            enabled: false,
            ..ApprovalConfig::default()
        });

        let response = manager
            .request_approval(tool_request("read_file"))
            .await
            .unwrap();
        assert!(response.approved);
        assert!(response.is_auto_approved());
    }

    #[tokio::test]
    async fn test_no_ui_is_an_error() {
        let manager = ApprovalManager::default();
        let result = manager.request_approval(tool_request("read_file")).await;
        assert!(matches!(result, Err(ApprovalError::NoUiRegistered)));
    }

    #[tokio::test]
    async fn test_approve_roundtrip() {
        let manager = manager_with_ui(true, false);
        let response = manager
            .request_approval(tool_request("read_file"))
            .await
            .unwrap();
        assert!(response.approved);
        assert!(!manager.has_pending_requests());
    }

    #[tokio::test]
    async fn test_remembered_tool_decision_short_circuits() {
        let manager = manager_with_ui(true, true);

        let first = manager
            .request_approval(tool_request("read_file"))
            .await
            .unwrap();
        assert!(first.approved);
        assert!(!first.is_remembered());

        // Swap in a UI that would deny: memory must win without
        // consulting it.
        manager.set_ui(Arc::new(SilentUi));
        let second = manager
            .request_approval(tool_request("read_file"))
            .await
            .unwrap();
        assert!(second.approved);
        assert!(second.is_remembered());
    }

    #[tokio::test]
    async fn test_remembered_denial_short_circuits() {
        let manager = manager_with_ui(false, true);

        let first = manager
            .request_approval(tool_request("rm_rf"))
            .await
            .unwrap();
        assert!(!first.approved);

        manager.set_ui(Arc::new(SilentUi));
        let second = manager
            .request_approval(tool_request("rm_rf"))
            .await
            .unwrap();
        assert!(!second.approved);
        assert!(second.is_remembered());
    }

    #[tokio::test]
    async fn test_memory_is_per_tool() {
        let manager = manager_with_ui(true, true);
        manager
            .request_approval(tool_request("read_file"))
            .await
            .unwrap();

        assert_eq!(manager.remembered_tool_decision("read_file"), Some(true));
        assert_eq!(manager.remembered_tool_decision("write_file"), None);
    }

    #[tokio::test]
    async fn test_clear_session_memory() {
        let manager = manager_with_ui(true, true);
        manager
            .request_approval(tool_request("read_file"))
            .await
            .unwrap();
        manager.clear_session_memory();
        assert_eq!(manager.remembered_tool_decision("read_file"), None);
    }

    #[tokio::test]
    async fn test_cancel_resolves_with_cancelled_response() {
        let manager = Arc::new(ApprovalManager::default());
        manager.set_ui(Arc::new(SilentUi));

        let request = tool_request("slow_tool");
        let request_id = request.id;
        let waiter = Arc::clone(&manager);
        let handle = tokio::spawn(async move { waiter.request_approval(request).await });

        // Give the request time to register
        tokio::task::yield_now().await;
        while !manager.has_pending_requests() {
            tokio::task::yield_now().await;
        }

        manager.cancel_request(request_id, "user aborted");
        let response = handle.await.unwrap().unwrap();
        assert!(!response.approved);
        assert!(response.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let manager = Arc::new(ApprovalManager::default());
        manager.set_ui(Arc::new(SilentUi));

        let mut handles = Vec::new();
        for i in 0..3 {
            let waiter = Arc::clone(&manager);
            let request = tool_request(&format!("tool_{i}"));
            handles.push(tokio::spawn(
                async move { waiter.request_approval(request).await },
            ));
        }

        while manager.pending.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }

        manager.cancel_all("shutting down");
        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert!(response.is_cancelled());
        }
        assert!(!manager.has_pending_requests());
    }

    #[tokio::test]
    async fn test_submit_unknown_request() {
        let manager = ApprovalManager::default();
        let result = manager.submit_response(ApprovalResponse::approve(Uuid::new_v4()));
        assert!(matches!(result, Err(ApprovalError::UnknownRequest(_))));
    }

    #[tokio::test]
    async fn test_query_analysis_memory() {
        let manager = manager_with_ui(true, true);
        let request = ApprovalRequest::query_analysis("Analysis", Map::new());
        manager.request_approval(request).await.unwrap();

        manager.set_ui(Arc::new(SilentUi));
        let second = manager
            .request_approval(ApprovalRequest::query_analysis("Analysis 2", Map::new()))
            .await
            .unwrap();
        assert!(second.approved);
        assert!(second.is_remembered());
    }
}

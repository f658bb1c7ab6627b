// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal session registry.
//!
//! Owns the set of terminal session records across all workspaces.
//! Mode changes are pure metadata — the multiplexer never learns about
//! modes; the broadcast hub enforces them per message.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use coterm_adapters::TerminalMultiplexer;
use coterm_core::{
    Clock, ClientId, TerminalMode, TerminalSession, TerminalSessionId, Workspace, WorkspaceId,
};

use crate::error::ApiError;

/// Registry of live terminal sessions.
pub struct TerminalRegistry {
    multiplexer: Arc<dyn TerminalMultiplexer>,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<TerminalSessionId, TerminalSession>>,
}

impl TerminalRegistry {
    pub fn new(multiplexer: Arc<dyn TerminalMultiplexer>, clock: Arc<dyn Clock>) -> Self {
        Self { multiplexer, clock, sessions: Mutex::new(HashMap::new()) }
    }

    /// Create a terminal session inside a running workspace's container.
    ///
    /// The caller (HTTP layer or manager) is responsible for verifying
    /// the workspace is `running` before handing its record over.
    pub async fn create(
        &self,
        workspace: &Workspace,
        requested_by: ClientId,
    ) -> Result<TerminalSession, ApiError> {
        let container = workspace
            .container
            .clone()
            .ok_or_else(|| ApiError::WorkspaceNotRunning(workspace.id.to_string()))?;

        let session = TerminalSession::new(
            workspace.id.clone(),
            container,
            requested_by,
            self.clock.epoch_ms(),
        );

        self.multiplexer
            .create_session(&session.container, &session.multiplexer_session)
            .await
            .map_err(|e| ApiError::Adapter(e.to_string()))?;

        info!(
            session_id = %session.id,
            workspace_id = %session.workspace_id,
            multiplexer_session = %session.multiplexer_session,
            "terminal session created"
        );

        self.sessions.lock().insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Snapshot of a session record.
    pub fn get(&self, id: &TerminalSessionId) -> Option<TerminalSession> {
        self.sessions.lock().get(id).cloned()
    }

    /// Sessions belonging to a workspace, newest first.
    pub fn list(&self, workspace_id: &WorkspaceId) -> Vec<TerminalSession> {
        let mut sessions: Vec<TerminalSession> = self
            .sessions
            .lock()
            .values()
            .filter(|s| &s.workspace_id == workspace_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        sessions
    }

    /// IDs of all sessions belonging to a workspace.
    pub fn session_ids_for(&self, workspace_id: &WorkspaceId) -> Vec<TerminalSessionId> {
        self.sessions
            .lock()
            .values()
            .filter(|s| &s.workspace_id == workspace_id)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Change a session's mode. Identity (multiplexer session name,
    /// owner) is untouched; already-attached connections pick the new
    /// mode up on their next input message.
    pub fn set_mode(
        &self,
        id: &TerminalSessionId,
        mode: TerminalMode,
    ) -> Result<TerminalSession, ApiError> {
        let mut sessions = self.sessions.lock();
        let session =
            sessions.get_mut(id).ok_or_else(|| ApiError::SessionNotFound(id.to_string()))?;
        session.mode = mode;
        info!(session_id = %id, %mode, "terminal mode changed");
        Ok(session.clone())
    }

    /// Remove a session record and best-effort kill the underlying
    /// multiplexer session. Removing an absent session is a no-op.
    pub async fn remove(&self, id: &TerminalSessionId) -> Option<TerminalSession> {
        let session = self.sessions.lock().remove(id)?;
        if let Err(e) =
            self.multiplexer.kill_session(&session.container, &session.multiplexer_session).await
        {
            warn!(session_id = %id, error = %e, "multiplexer kill failed (best-effort)");
        }
        info!(session_id = %id, workspace_id = %session.workspace_id, "terminal session removed");
        Some(session)
    }

    /// Remove every session belonging to a workspace. Returns how many
    /// records were removed.
    pub async fn remove_for_workspace(&self, workspace_id: &WorkspaceId) -> usize {
        let mut removed = 0;
        for id in self.session_ids_for(workspace_id) {
            if self.remove(&id).await.is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drop a record without touching the multiplexer — used when the
    /// underlying session is already known to be gone.
    pub fn forget(&self, id: &TerminalSessionId) {
        self.sessions.lock().remove(id);
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identity, scope, and lifecycle status.
//!
//! A workspace is a disposable containerized dev environment bound to a
//! scope. The scope key enforces the uniqueness invariant: at most one
//! active workspace per scope key at any time.

use serde::{Deserialize, Serialize};

use crate::client::ClientId;

crate::define_id! {
    /// Unique identifier for a workspace instance.
    ///
    /// Workspaces are ephemeral — the ID outlives nothing; once a
    /// workspace reaches `stopped` or `error` a fresh launch mints a
    /// fresh ID.
    pub struct WorkspaceId("wks-");
}

/// Binding key that determines workspace uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum WorkspaceScope {
    /// One workspace per project.
    Project(String),
    /// One workspace per user.
    User(String),
    /// A single shared workspace.
    Global,
}

impl WorkspaceScope {
    /// The uniqueness key for this scope.
    pub fn scope_key(&self) -> String {
        match self {
            WorkspaceScope::Project(key) => format!("project:{}", key),
            WorkspaceScope::User(key) => format!("user:{}", key),
            WorkspaceScope::Global => "global".to_string(),
        }
    }
}

/// Status of a workspace in its lifecycle.
///
/// `starting -> {running, error}`, `running -> stopping -> stopped`,
/// any state `-> error` on adapter failure. `error` is terminal but
/// surfaced — a fresh launch is required to retry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    /// Container start requested, readiness not yet observed
    #[default]
    Starting,
    /// Container is up and serving
    Running,
    /// Teardown in progress
    Stopping,
    /// Clean terminal state
    Stopped,
    /// Launch or teardown failed
    Error {
        /// Reason for the failure
        reason: String,
    },
}

impl WorkspaceStatus {
    /// Active states count against the per-scope uniqueness invariant.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            WorkspaceStatus::Starting | WorkspaceStatus::Running | WorkspaceStatus::Stopping
        )
    }
}

impl std::fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceStatus::Starting => write!(f, "starting"),
            WorkspaceStatus::Running => write!(f, "running"),
            WorkspaceStatus::Stopping => write!(f, "stopping"),
            WorkspaceStatus::Stopped => write!(f, "stopped"),
            WorkspaceStatus::Error { reason } => write!(f, "error: {}", reason),
        }
    }
}

/// A managed workspace record.
///
/// Exclusively owned by the workspace manager and mutated only through
/// its operations; everyone else sees cloned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub scope: WorkspaceScope,
    pub status: WorkspaceStatus,
    /// Container name handle, absent until the start task has launched one.
    pub container: Option<String>,
    /// Host port mapped to the container's editor, set once running.
    pub port: Option<u16>,
    pub created_by: ClientId,
    pub created_at_ms: u64,
    pub last_heartbeat_ms: u64,
}

impl Workspace {
    /// Create a fresh record in `starting` state.
    pub fn new(scope: WorkspaceScope, created_by: ClientId, now_ms: u64) -> Self {
        Self {
            id: WorkspaceId::new(),
            scope,
            status: WorkspaceStatus::Starting,
            container: None,
            port: None,
            created_by,
            created_at_ms: now_ms,
            last_heartbeat_ms: now_ms,
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;

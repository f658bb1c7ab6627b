// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal session records and connection role derivation.
//!
//! A terminal session is a named, container-resident multiplexer session
//! that outlives any single viewer connection. The session's mode plus
//! its owner decide, per message, which connections may type.

use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::workspace::WorkspaceId;

crate::define_id! {
    /// Unique identifier for a terminal session.
    pub struct TerminalSessionId("trm-");
}

/// Access mode of a terminal session.
///
/// Mode is a property of the session, not of any single connection —
/// it governs all current and future connections uniformly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalMode {
    /// Every connection may type
    #[default]
    Collaborative,
    /// Only the owner may type
    Readonly,
}

crate::simple_display! {
    TerminalMode {
        Collaborative => "collaborative",
        Readonly => "readonly",
    }
}

/// Role a connection holds against a session, derived per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Writer,
    Spectator,
}

crate::simple_display! {
    Role {
        Writer => "writer",
        Spectator => "spectator",
    }
}

/// Derive the role of `client` against a session.
///
/// Recomputed on every attach and every input message — never cached on
/// the connection — because the mode can change while connections are
/// attached.
pub fn role_for(mode: TerminalMode, owner: &ClientId, client: &ClientId) -> Role {
    if mode == TerminalMode::Collaborative || client == owner {
        Role::Writer
    } else {
        Role::Spectator
    }
}

/// A terminal session record.
///
/// Belongs to exactly one workspace and is destroyed when the workspace
/// stops. The multiplexer session name is stable across viewer
/// reconnects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSession {
    pub id: TerminalSessionId,
    pub workspace_id: WorkspaceId,
    /// Container the multiplexer session lives in, denormalized from the
    /// workspace at creation time.
    pub container: String,
    /// Underlying multiplexer session name, unique within the workspace.
    pub multiplexer_session: String,
    pub mode: TerminalMode,
    pub owner_id: ClientId,
    pub created_at_ms: u64,
}

impl TerminalSession {
    pub fn new(
        workspace_id: WorkspaceId,
        container: impl Into<String>,
        owner_id: ClientId,
        now_ms: u64,
    ) -> Self {
        let id = TerminalSessionId::new();
        let multiplexer_session = format!("term-{}", id.short(8));
        Self {
            id,
            workspace_id,
            container: container.into(),
            multiplexer_session,
            mode: TerminalMode::default(),
            owner_id,
            created_at_ms: now_ms,
        }
    }

    /// Role of `client` against this session right now.
    pub fn role_of(&self, client: &ClientId) -> Role {
        role_for(self.mode, &self.owner_id, client)
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal multiplexer adapter.
//!
//! Sessions are tmux sessions inside the workspace container, driven
//! through `docker exec`. The adapter knows nothing about modes or
//! viewers — access arbitration lives entirely in the broadcast hub.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{run_for_stdout, run_with_timeout, TMUX_TIMEOUT};

/// Errors from multiplexer operations.
#[derive(Debug, Error)]
pub enum MultiplexerError {
    /// The underlying session (or its container) no longer exists.
    #[error("session gone: {0}")]
    SessionGone(String),
    #[error("multiplexer command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for named persistent terminal sessions inside a container.
#[async_trait]
pub trait TerminalMultiplexer: Send + Sync {
    /// Create a detached session named `session` inside `container`.
    async fn create_session(&self, container: &str, session: &str)
        -> Result<(), MultiplexerError>;

    /// Inject keystrokes into a session.
    async fn send_keys(
        &self,
        container: &str,
        session: &str,
        data: &str,
    ) -> Result<(), MultiplexerError>;

    /// Capture the full current visible pane content.
    ///
    /// Returns [`MultiplexerError::SessionGone`] when the session or its
    /// container has died — the hub treats that as terminal.
    async fn capture_pane(&self, container: &str, session: &str)
        -> Result<String, MultiplexerError>;

    /// Kill a session. Best-effort teardown; killing an absent session
    /// is not an error.
    async fn kill_session(&self, container: &str, session: &str) -> Result<(), MultiplexerError>;
}

/// tmux-over-`docker exec` implementation.
pub struct TmuxMultiplexer {
    /// Scrollback lines included in captures (tmux `-S -<n>`).
    capture_lines: u32,
}

impl TmuxMultiplexer {
    pub fn new(capture_lines: u32) -> Self {
        Self { capture_lines }
    }

    async fn exec_tmux(
        &self,
        container: &str,
        tmux_args: &[&str],
        label: &'static str,
    ) -> Result<String, MultiplexerError> {
        let mut cmd = Command::new("docker");
        cmd.args(["exec", container, "tmux"]).args(tmux_args);
        run_for_stdout(cmd, TMUX_TIMEOUT, label).await.map_err(|e| {
            let text = e.to_string();
            // A dead container or missing session both surface as exec
            // failures; either way the session is unusable.
            if text.contains("can't find session")
                || text.contains("no server running")
                || text.contains("is not running")
                || text.contains("No such container")
            {
                MultiplexerError::SessionGone(text)
            } else {
                MultiplexerError::CommandFailed(text)
            }
        })
    }
}

impl Default for TmuxMultiplexer {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl TerminalMultiplexer for TmuxMultiplexer {
    async fn create_session(
        &self,
        container: &str,
        session: &str,
    ) -> Result<(), MultiplexerError> {
        self.exec_tmux(
            container,
            &["new-session", "-d", "-s", session, "-x", "200", "-y", "50"],
            "tmux new-session",
        )
        .await?;
        Ok(())
    }

    async fn send_keys(
        &self,
        container: &str,
        session: &str,
        data: &str,
    ) -> Result<(), MultiplexerError> {
        // `-l` sends the bytes literally instead of interpreting key names;
        // viewers type exactly what arrives on the wire.
        self.exec_tmux(container, &["send-keys", "-t", session, "-l", data], "tmux send-keys")
            .await?;
        Ok(())
    }

    async fn capture_pane(
        &self,
        container: &str,
        session: &str,
    ) -> Result<String, MultiplexerError> {
        let history = format!("-{}", self.capture_lines);
        self.exec_tmux(
            container,
            &["capture-pane", "-t", session, "-p", "-e", "-S", &history],
            "tmux capture-pane",
        )
        .await
    }

    async fn kill_session(&self, container: &str, session: &str) -> Result<(), MultiplexerError> {
        let mut cmd = Command::new("docker");
        cmd.args(["exec", container, "tmux", "kill-session", "-t", session]);
        // Best-effort: the container may already be gone
        let _ = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux kill-session").await;
        Ok(())
    }
}

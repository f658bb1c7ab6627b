// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle workspace reaper.
//!
//! Clients keep their workspace alive by posting heartbeats; a running
//! workspace whose last heartbeat is older than the idle timeout gets
//! stopped through the ordinary stop path, so its sessions and viewers
//! are torn down the same way an explicit stop would.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use coterm_core::{Clock, WorkspaceStatus};

use crate::manager::WorkspaceManager;

pub struct HeartbeatReaper {
    manager: Arc<WorkspaceManager>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    interval: Duration,
}

impl HeartbeatReaper {
    pub fn new(
        manager: Arc<WorkspaceManager>,
        clock: Arc<dyn Clock>,
        idle_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self { manager, clock, idle_timeout, interval }
    }

    /// One reaper pass. Returns how many workspaces were stopped.
    ///
    /// Only `running` workspaces are considered — a workspace still
    /// starting has had no chance to heartbeat, and one already stopping
    /// needs no help.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.epoch_ms();
        let cutoff = self.idle_timeout.as_millis() as u64;

        let stale: Vec<_> = self
            .manager
            .list(None)
            .into_iter()
            .filter(|w| {
                w.status == WorkspaceStatus::Running
                    && now.saturating_sub(w.last_heartbeat_ms) > cutoff
            })
            .collect();

        let mut reaped = 0;
        for workspace in stale {
            info!(workspace_id = %workspace.id,
                  idle_ms = now.saturating_sub(workspace.last_heartbeat_ms),
                  "reaping idle workspace");
            match self.manager.stop(&workspace.id).await {
                Ok(_) => reaped += 1,
                Err(e) => warn!(workspace_id = %workspace.id, error = %e, "reap failed"),
            }
        }
        reaped
    }

    /// Run sweeps on the configured interval until shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let reaped = self.sweep().await;
            if reaped > 0 {
                debug!(reaped, "reaper pass complete");
            }
        }
        debug!("reaper stopped");
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;

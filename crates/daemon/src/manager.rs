// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lifecycle manager.
//!
//! Owns every workspace record and enforces the per-scope uniqueness
//! invariant: at most one active workspace (starting, running, or
//! stopping) per scope key. Launch and stop return as soon as the
//! record transitions; the container work happens in spawned tasks that
//! write their outcome back into the record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

use coterm_adapters::{ContainerRuntime, StartRequest, CONTAINER_PREFIX};
use coterm_core::{ClientId, Clock, Workspace, WorkspaceId, WorkspaceScope, WorkspaceStatus};

use crate::config::Config;
use crate::error::ApiError;
use crate::hub::PtyBroadcastHub;
use crate::registry::TerminalRegistry;

/// Pause before the single retry of a failed container start or stop.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Close reason pushed to viewers when their workspace is torn down.
pub const REASON_WORKSPACE_STOPPED: &str = "workspace stopped";

pub struct WorkspaceManager {
    runtime: Arc<dyn ContainerRuntime>,
    registry: Arc<TerminalRegistry>,
    hub: Arc<PtyBroadcastHub>,
    clock: Arc<dyn Clock>,
    image: String,
    port_start: u16,
    port_end: u16,
    ready_poll: Duration,
    ready_attempts: u32,
    workspaces: Mutex<HashMap<WorkspaceId, Workspace>>,
}

impl WorkspaceManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        registry: Arc<TerminalRegistry>,
        hub: Arc<PtyBroadcastHub>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            runtime,
            registry,
            hub,
            clock,
            image: config.image.clone(),
            port_start: config.port_start,
            port_end: config.port_end,
            ready_poll: config.ready_poll,
            ready_attempts: config.ready_attempts,
            workspaces: Mutex::new(HashMap::new()),
        }
    }

    /// Launch a workspace for a scope.
    ///
    /// Returns the record in `starting` state immediately; the container
    /// comes up in the background and the record flips to `running` once
    /// readiness is observed, or to `error` after the start retry is
    /// exhausted. Scope uniqueness and port reservation happen under one
    /// lock, so two racing launches for the same scope get exactly one
    /// record and one conflict.
    pub fn launch(
        self: &Arc<Self>,
        scope: WorkspaceScope,
        created_by: ClientId,
    ) -> Result<Workspace, ApiError> {
        let record = {
            let mut workspaces = self.workspaces.lock();

            let scope_key = scope.scope_key();
            if workspaces
                .values()
                .any(|w| w.status.is_active() && w.scope.scope_key() == scope_key)
            {
                return Err(ApiError::ScopeConflict(scope_key));
            }

            let port = lowest_free_port(self.port_start, self.port_end, workspaces.values())
                .ok_or(ApiError::PortsExhausted)?;

            let mut workspace = Workspace::new(scope, created_by, self.clock.epoch_ms());
            workspace.port = Some(port);
            workspaces.insert(workspace.id.clone(), workspace.clone());
            workspace
        };

        info!(workspace_id = %record.id, scope = %record.scope.scope_key(),
              port = record.port, "workspace launch requested");
        tokio::spawn(run_start(Arc::clone(self), record.id.clone()));
        Ok(record)
    }

    pub fn get(&self, id: &WorkspaceId) -> Option<Workspace> {
        self.workspaces.lock().get(id).cloned()
    }

    /// All workspace records, optionally filtered by scope key, newest first.
    pub fn list(&self, scope_key: Option<&str>) -> Vec<Workspace> {
        let mut records: Vec<Workspace> = self
            .workspaces
            .lock()
            .values()
            .filter(|w| scope_key.map_or(true, |key| w.scope.scope_key() == key))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        records
    }

    /// Record a liveness heartbeat.
    ///
    /// Only a running workspace accumulates heartbeats; in every other
    /// state the call succeeds but changes nothing, so a client racing a
    /// teardown cannot resurrect the record.
    pub fn record_heartbeat(&self, id: &WorkspaceId) -> Result<Workspace, ApiError> {
        let now = self.clock.epoch_ms();
        let mut workspaces = self.workspaces.lock();
        let workspace = workspaces
            .get_mut(id)
            .ok_or_else(|| ApiError::WorkspaceNotFound(id.to_string()))?;
        if workspace.status == WorkspaceStatus::Running {
            workspace.last_heartbeat_ms = now;
        }
        Ok(workspace.clone())
    }

    /// Stop a workspace. Idempotent — stopping an already stopping,
    /// stopped, or errored workspace returns its record unchanged.
    ///
    /// Sessions are closed and viewers disconnected before the record is
    /// returned; the container teardown itself runs in the background.
    pub async fn stop(self: &Arc<Self>, id: &WorkspaceId) -> Result<Workspace, ApiError> {
        let record = {
            let mut workspaces = self.workspaces.lock();
            let workspace = workspaces
                .get_mut(id)
                .ok_or_else(|| ApiError::WorkspaceNotFound(id.to_string()))?;
            if !workspace.status.is_active() || workspace.status == WorkspaceStatus::Stopping {
                return Ok(workspace.clone());
            }
            workspace.status = WorkspaceStatus::Stopping;
            workspace.clone()
        };

        for session_id in self.registry.session_ids_for(id) {
            self.hub.close_all(&session_id, REASON_WORKSPACE_STOPPED);
        }
        self.registry.remove_for_workspace(id).await;

        info!(workspace_id = %id, "workspace stop requested");
        tokio::spawn(run_stop(Arc::clone(self), id.clone()));
        Ok(record)
    }

    /// Remove containers left behind by a previous daemon run.
    ///
    /// Called once at boot, before the listener opens — any container
    /// carrying our name prefix belongs to a workspace record that no
    /// longer exists.
    pub async fn clean_stale_containers(&self) -> usize {
        let names = match self.runtime.list_owned().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "stale container scan failed");
                return 0;
            }
        };
        let mut cleaned = 0;
        for name in names {
            match self.runtime.stop(&name).await {
                Ok(()) => {
                    info!(container = %name, "removed stale container");
                    cleaned += 1;
                }
                Err(e) => warn!(container = %name, error = %e, "stale container removal failed"),
            }
        }
        cleaned
    }

    fn update<F: FnOnce(&mut Workspace)>(&self, id: &WorkspaceId, f: F) -> Option<Workspace> {
        let mut workspaces = self.workspaces.lock();
        let workspace = workspaces.get_mut(id)?;
        f(workspace);
        Some(workspace.clone())
    }

    fn status_of(&self, id: &WorkspaceId) -> Option<WorkspaceStatus> {
        self.workspaces.lock().get(id).map(|w| w.status.clone())
    }
}

/// Lowest port in `[start, end]` not reserved by an active workspace.
fn lowest_free_port<'a>(
    start: u16,
    end: u16,
    active: impl Iterator<Item = &'a Workspace>,
) -> Option<u16> {
    let taken: Vec<u16> = active
        .filter(|w| w.status.is_active())
        .filter_map(|w| w.port)
        .collect();
    (start..=end).find(|p| !taken.contains(p))
}

/// Background start task: launch the container (one retry), then poll
/// readiness until the record can flip to `running`.
async fn run_start(manager: Arc<WorkspaceManager>, id: WorkspaceId) {
    let Some(workspace) = manager.get(&id) else { return };
    let Some(port) = workspace.port else { return };
    let request = StartRequest {
        workspace_id: id.clone(),
        image: manager.image.clone(),
        port,
    };

    let container = match manager.runtime.start(&request).await {
        Ok(name) => name,
        Err(first) => {
            warn!(workspace_id = %id, error = %first, "container start failed, retrying");
            sleep(RETRY_BACKOFF).await;
            match manager.runtime.start(&request).await {
                Ok(name) => name,
                Err(e) => {
                    error!(workspace_id = %id, error = %e, "container start failed");
                    manager.update(&id, |w| {
                        w.status = WorkspaceStatus::Error { reason: e.to_string() };
                    });
                    return;
                }
            }
        }
    };

    // A stop issued while the start call was in flight wins. Its removal
    // ran before this container existed, so tear it down here — bowing
    // out would orphan the container and keep its port bound.
    if manager.status_of(&id) != Some(WorkspaceStatus::Starting) {
        if let Err(e) = manager.runtime.stop(&container).await {
            warn!(workspace_id = %id, error = %e, "teardown of superseded container failed");
        }
        return;
    }
    manager.update(&id, |w| w.container = Some(container.clone()));

    for _ in 0..manager.ready_attempts {
        match manager.runtime.is_ready(&container).await {
            Ok(true) => {
                let now = manager.clock.epoch_ms();
                manager.update(&id, |w| {
                    if w.status == WorkspaceStatus::Starting {
                        w.status = WorkspaceStatus::Running;
                        w.last_heartbeat_ms = now;
                        info!(workspace_id = %w.id, port, "workspace running");
                    }
                });
                return;
            }
            Ok(false) => {}
            Err(e) => warn!(workspace_id = %id, error = %e, "readiness check failed"),
        }
        if manager.status_of(&id) != Some(WorkspaceStatus::Starting) {
            return;
        }
        sleep(manager.ready_poll).await;
    }

    error!(workspace_id = %id, "workspace never became ready");
    manager.update(&id, |w| {
        if w.status == WorkspaceStatus::Starting {
            w.status = WorkspaceStatus::Error { reason: "readiness timeout".to_string() };
        }
    });
    if let Err(e) = manager.runtime.stop(&container).await {
        warn!(workspace_id = %id, error = %e, "teardown of unready container failed");
    }
}

/// Background stop task: remove the container (one retry), then mark
/// the record `stopped`. The name is derived, not read from the record,
/// so a stop that raced the start task still finds its target.
async fn run_stop(manager: Arc<WorkspaceManager>, id: WorkspaceId) {
    let container = format!("{}{}", CONTAINER_PREFIX, id.suffix());

    let result = match manager.runtime.stop(&container).await {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(workspace_id = %id, error = %first, "container stop failed, retrying");
            sleep(RETRY_BACKOFF).await;
            manager.runtime.stop(&container).await
        }
    };

    match result {
        Ok(()) => {
            manager.update(&id, |w| {
                w.status = WorkspaceStatus::Stopped;
                info!(workspace_id = %w.id, "workspace stopped");
            });
        }
        Err(e) => {
            error!(workspace_id = %id, error = %e, "container stop failed");
            manager.update(&id, |w| {
                w.status = WorkspaceStatus::Error { reason: e.to_string() };
            });
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

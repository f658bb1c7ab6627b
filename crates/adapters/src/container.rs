// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime adapter.
//!
//! The daemon never shells out to docker directly — all container
//! lifecycle goes through [`ContainerRuntime`]. The production
//! implementation drives the Docker CLI; readiness is observed by
//! polling [`ContainerRuntime::is_ready`], never by blocking on start.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use coterm_core::WorkspaceId;

use crate::subprocess::{run_for_stdout, run_with_timeout, DOCKER_TIMEOUT};

/// Name prefix for every container this daemon owns. Used to scope
/// boot-time cleanup to exactly our containers.
pub const CONTAINER_PREFIX: &str = "coterm-ws-";

/// Errors from container runtime operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("start failed: {0}")]
    StartFailed(String),
    #[error("stop failed: {0}")]
    StopFailed(String),
    #[error("inspect failed: {0}")]
    InspectFailed(String),
}

/// Parameters for starting a workspace container.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub workspace_id: WorkspaceId,
    /// Editor image to run (exposes the editor on port 8443).
    pub image: String,
    /// Host port mapped to the container's editor port.
    pub port: u16,
}

impl StartRequest {
    /// Deterministic container name for a workspace.
    pub fn container_name(&self) -> String {
        format!("{}{}", CONTAINER_PREFIX, self.workspace_id.suffix())
    }

    /// Named volume holding the workspace's files.
    pub fn volume_name(&self) -> String {
        self.container_name()
    }
}

/// Adapter for the container runtime backing workspaces.
///
/// `start` acknowledges the request (the container exists and was asked
/// to run); callers poll `is_ready` until the runtime reports the
/// container up. All operations are cancel-safe.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a workspace container, returning its name handle.
    async fn start(&self, req: &StartRequest) -> Result<String, ContainerError>;

    /// Whether the container is up and serving.
    async fn is_ready(&self, container: &str) -> Result<bool, ContainerError>;

    /// Stop and release a container and its volume. Must be idempotent —
    /// stopping an absent container is not an error.
    async fn stop(&self, container: &str) -> Result<(), ContainerError>;

    /// Names of all containers owned by this daemon, running or not.
    async fn list_owned(&self) -> Result<Vec<String>, ContainerError>;
}

/// Docker CLI implementation.
pub struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn start(&self, req: &StartRequest) -> Result<String, ContainerError> {
        let name = req.container_name();
        let volume = req.volume_name();

        // Replace any leftover container with the same name (crashed
        // daemon, unfinished teardown) before starting fresh.
        let _ = run_docker(&["rm", "-f", &name]).await;

        run_docker(&["volume", "create", &volume])
            .await
            .map_err(|e| ContainerError::StartFailed(format!("volume create failed: {}", e)))?;

        let port_mapping = format!("{}:8443", req.port);
        let vol_mount = format!("{}:/config/workspace", volume);
        let args = [
            "run",
            "-d",
            "--name",
            &name,
            "-p",
            &port_mapping,
            "-v",
            &vol_mount,
            "-e",
            "PUID=1000",
            "-e",
            "PGID=1000",
            "-e",
            "PASSWORD=",
            "-e",
            "CS_DISABLE_PROXY=1",
            "-e",
            "DEFAULT_WORKSPACE=/config/workspace",
            &req.image,
        ];

        tracing::info!(workspace_id = %req.workspace_id, container = %name, port = req.port, "starting workspace container");

        if let Err(e) = run_docker(&args).await {
            // Release the port binding so a retry can reuse it
            let _ = run_docker(&["rm", "-f", &name]).await;
            return Err(ContainerError::StartFailed(format!("docker run failed: {}", e)));
        }

        Ok(name)
    }

    async fn is_ready(&self, container: &str) -> Result<bool, ContainerError> {
        let mut cmd = Command::new("docker");
        cmd.args(["inspect", "-f", "{{.State.Running}}", container]);
        match run_for_stdout(cmd, DOCKER_TIMEOUT, "docker inspect").await {
            Ok(state) => Ok(state == "true"),
            Err(e) => Err(ContainerError::InspectFailed(e.to_string())),
        }
    }

    async fn stop(&self, container: &str) -> Result<(), ContainerError> {
        // `rm -f` covers both stop and removal; absent containers fail
        // the CLI but that is exactly the idempotent case.
        let removed = run_docker(&["rm", "-f", container]).await;
        let _ = run_docker(&["volume", "rm", container]).await;

        match removed {
            Ok(_) => Ok(()),
            Err(e) if e.contains("No such container") => Ok(()),
            Err(e) => Err(ContainerError::StopFailed(e)),
        }
    }

    async fn list_owned(&self) -> Result<Vec<String>, ContainerError> {
        let filter = format!("name={}", CONTAINER_PREFIX);
        let mut cmd = Command::new("docker");
        cmd.args(["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"]);
        let stdout = run_for_stdout(cmd, DOCKER_TIMEOUT, "docker ps")
            .await
            .map_err(|e| ContainerError::InspectFailed(e.to_string()))?;
        Ok(stdout.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
    }
}

/// Run a docker CLI command, returning stdout on success.
async fn run_docker(args: &[&str]) -> Result<String, String> {
    let mut cmd = Command::new("docker");
    cmd.args(args);
    let output = run_with_timeout(cmd, DOCKER_TIMEOUT, "docker").await.map_err(|e| e.to_string())?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

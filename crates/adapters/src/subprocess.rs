// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with timeouts.
//!
//! All docker/tmux invocations go through [`run_with_timeout`] so a
//! wedged CLI can never stall a lifecycle task indefinitely.

use std::process::Output;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Timeout for docker lifecycle commands (run/stop/rm can be slow).
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for tmux commands proxied through `docker exec`.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from subprocess execution.
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} failed to spawn: {source}")]
    Spawn {
        label: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: &'static str, timeout: Duration },

    #[error("{label} exited with {code:?}: {stderr}")]
    Failed { label: &'static str, code: Option<i32>, stderr: String },
}

/// Run a command with a timeout, returning its output.
///
/// A non-zero exit status is an error; stderr is trimmed into the
/// error message so callers can surface it directly.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &'static str,
) -> Result<Output, SubprocessError> {
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| SubprocessError::Timeout { label, timeout })?
        .map_err(|source| SubprocessError::Spawn { label, source })?;

    if !output.status.success() {
        return Err(SubprocessError::Failed {
            label,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

/// Run a command, returning trimmed stdout.
pub async fn run_for_stdout(
    cmd: Command,
    timeout: Duration,
    label: &'static str,
) -> Result<String, SubprocessError> {
    let output = run_with_timeout(cmd, timeout, label).await?;
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;

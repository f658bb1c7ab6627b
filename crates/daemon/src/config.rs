// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.
//!
//! Every tunable has a default; `COTERM_*` variables override. Tests
//! construct `Config` directly with short intervals instead of touching
//! the process environment.

use std::net::SocketAddr;
use std::time::Duration;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP/WebSocket listener binds.
    pub http_addr: SocketAddr,
    /// Editor image run per workspace (exposes port 8443).
    pub image: String,
    /// Inclusive host port range allocated to workspace containers.
    pub port_start: u16,
    pub port_end: u16,
    /// Heartbeat age beyond which the reaper stops a workspace.
    pub idle_timeout: Duration,
    /// Interval between reaper sweeps.
    pub reap_interval: Duration,
    /// Interval between snapshot broadcasts per terminal session.
    pub tick: Duration,
    /// Scrollback lines included in each snapshot.
    pub capture_lines: u32,
    /// Container readiness polling cadence and cap.
    pub ready_poll: Duration,
    pub ready_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: default_addr(),
            image: "lscr.io/linuxserver/code-server:latest".to_string(),
            port_start: 9400,
            port_end: 9499,
            idle_timeout: Duration::from_secs(90),
            reap_interval: Duration::from_secs(15),
            tick: Duration::from_millis(200),
            capture_lines: 100,
            ready_poll: Duration::from_millis(500),
            ready_attempts: 60, // 60 * 500ms = 30s
        }
    }
}

// Known-good literal, parsed at startup only
#[allow(clippy::unwrap_used)]
fn default_addr() -> SocketAddr {
    "127.0.0.1:7601".parse().unwrap()
}

impl Config {
    /// Build configuration from `COTERM_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(addr) = env_parse::<SocketAddr>("COTERM_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Ok(image) = std::env::var("COTERM_WORKSPACE_IMAGE") {
            if !image.is_empty() {
                config.image = image;
            }
        }
        if let Some(port) = env_parse::<u16>("COTERM_PORT_START") {
            config.port_start = port;
        }
        if let Some(port) = env_parse::<u16>("COTERM_PORT_END") {
            config.port_end = port;
        }
        if let Some(secs) = env_parse::<u64>("COTERM_IDLE_TIMEOUT_SECS") {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("COTERM_REAP_INTERVAL_SECS") {
            config.reap_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("COTERM_TICK_MS") {
            config.tick = Duration::from_millis(ms);
        }
        if let Some(lines) = env_parse::<u32>("COTERM_CAPTURE_LINES") {
            config.capture_lines = lines;
        }
        if let Some(ms) = env_parse::<u64>("COTERM_DOCKER_READY_POLL_MS") {
            config.ready_poll = Duration::from_millis(ms);
        }
        if let Some(attempts) = env_parse::<u32>("COTERM_DOCKER_READY_ATTEMPTS") {
            config.ready_attempts = attempts;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

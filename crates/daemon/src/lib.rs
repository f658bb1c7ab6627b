// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! coterm daemon library.
//!
//! Components, leaves first: the adapters (container runtime, terminal
//! multiplexer) are external collaborators; [`registry`] owns terminal
//! session records; [`hub`] fans each session's screen snapshots out to
//! viewers; [`manager`] owns workspace lifecycles and is the top-level
//! orchestrator; [`reaper`] reclaims heartbeat-stale workspaces.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod manager;
pub mod reaper;
pub mod registry;

pub use config::Config;
pub use error::ApiError;
pub use hub::{Frame, PtyBroadcastHub, ViewerHandle};
pub use manager::WorkspaceManager;
pub use reaper::HeartbeatReaper;
pub use registry::TerminalRegistry;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! coterm-core: domain types for the coterm workspace daemon.

pub mod client;
pub mod clock;
pub mod macros;
pub mod terminal;
pub mod workspace;

pub use client::ClientId;
pub use clock::{Clock, FakeClock, SystemClock};
pub use terminal::{role_for, Role, TerminalMode, TerminalSession, TerminalSessionId};
pub use workspace::{Workspace, WorkspaceId, WorkspaceScope, WorkspaceStatus};

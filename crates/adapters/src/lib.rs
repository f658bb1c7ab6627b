// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! coterm-adapters: boundaries to the container runtime and the
//! terminal multiplexer.
//!
//! Both collaborators are slow, external, and fallible; the daemon only
//! ever talks to them through the [`ContainerRuntime`] and
//! [`TerminalMultiplexer`] traits so that every lifecycle and broadcast
//! path can be driven by the in-memory fakes in tests.

pub mod container;
pub mod multiplexer;
pub mod subprocess;

pub use container::{ContainerError, ContainerRuntime, DockerRuntime, StartRequest, CONTAINER_PREFIX};
pub use multiplexer::{MultiplexerError, TerminalMultiplexer, TmuxMultiplexer};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerCall, FakeContainerRuntime, FakeMultiplexer, MultiplexerCall};

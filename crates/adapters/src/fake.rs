// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for the container runtime and multiplexer.
//!
//! Calls are recorded for assertion; readiness and failures are
//! controllable so lifecycle tests can drive every transition without
//! docker or tmux installed.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::container::{ContainerError, ContainerRuntime, StartRequest};
use crate::multiplexer::{MultiplexerError, TerminalMultiplexer};

/// A recorded container runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCall {
    Start { container: String, port: u16 },
    Stop { container: String },
}

#[derive(Default)]
struct ContainerState {
    calls: Vec<ContainerCall>,
    running: HashMap<String, bool>,
    fail_next_start: Option<String>,
    hold_next_start: bool,
    stop_failures: u32,
}

/// Fake container runtime with controllable readiness and failures.
///
/// Containers start not-ready; tests flip them with [`mark_ready`]
/// (or construct with [`auto_ready`]) to simulate the runtime
/// observing the container come up.
///
/// [`mark_ready`]: FakeContainerRuntime::mark_ready
/// [`auto_ready`]: FakeContainerRuntime::auto_ready
pub struct FakeContainerRuntime {
    state: Mutex<ContainerState>,
    auto_ready: bool,
    start_gate: Notify,
}

impl FakeContainerRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ContainerState::default()),
            auto_ready: false,
            start_gate: Notify::new(),
        }
    }

    /// Containers report ready immediately after start.
    pub fn auto_ready() -> Self {
        Self {
            state: Mutex::new(ContainerState::default()),
            auto_ready: true,
            start_gate: Notify::new(),
        }
    }

    /// Make the container report ready on the next `is_ready` poll.
    pub fn mark_ready(&self, container: &str) {
        self.state.lock().running.insert(container.to_string(), true);
    }

    /// Fail the next `start` call with the given reason.
    pub fn fail_next_start(&self, reason: &str) {
        self.state.lock().fail_next_start = Some(reason.to_string());
    }

    /// Hold the next `start` call in flight until [`release_start`].
    /// Lets tests interleave other operations mid-start.
    ///
    /// [`release_start`]: FakeContainerRuntime::release_start
    pub fn hold_next_start(&self) {
        self.state.lock().hold_next_start = true;
    }

    /// Let a start held by [`hold_next_start`] proceed. Safe to call
    /// before the start arrives; the permit is stored.
    ///
    /// [`hold_next_start`]: FakeContainerRuntime::hold_next_start
    pub fn release_start(&self) {
        self.start_gate.notify_one();
    }

    /// Fail the next `n` `stop` calls.
    pub fn fail_stops(&self, n: u32) {
        self.state.lock().stop_failures = n;
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ContainerCall> {
        self.state.lock().calls.clone()
    }

    /// Containers started and not yet stopped.
    pub fn live_containers(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.running.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FakeContainerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn start(&self, req: &StartRequest) -> Result<String, ContainerError> {
        let held = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.hold_next_start)
        };
        if held {
            self.start_gate.notified().await;
        }
        let name = req.container_name();
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_start.take() {
            return Err(ContainerError::StartFailed(reason));
        }
        state.calls.push(ContainerCall::Start { container: name.clone(), port: req.port });
        state.running.insert(name.clone(), self.auto_ready);
        Ok(name)
    }

    async fn is_ready(&self, container: &str) -> Result<bool, ContainerError> {
        let state = self.state.lock();
        match state.running.get(container) {
            Some(ready) => Ok(*ready),
            None => Err(ContainerError::InspectFailed(format!("no such container: {}", container))),
        }
    }

    async fn stop(&self, container: &str) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        if state.stop_failures > 0 {
            state.stop_failures -= 1;
            return Err(ContainerError::StopFailed("simulated stop failure".to_string()));
        }
        state.calls.push(ContainerCall::Stop { container: container.to_string() });
        state.running.remove(container);
        Ok(())
    }

    async fn list_owned(&self) -> Result<Vec<String>, ContainerError> {
        Ok(self.live_containers())
    }
}

/// A recorded multiplexer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiplexerCall {
    Create { container: String, session: String },
    SendKeys { session: String, data: String },
    Kill { session: String },
}

#[derive(Default)]
struct MultiplexerState {
    calls: Vec<MultiplexerCall>,
    screens: HashMap<String, String>,
    fail_next_create: bool,
}

/// Fake multiplexer holding an in-memory screen per session.
///
/// `send_keys` appends to the screen content (as if the shell echoed
/// every keystroke), so snapshot assertions can observe exactly which
/// inputs took effect.
pub struct FakeMultiplexer {
    state: Mutex<MultiplexerState>,
}

impl FakeMultiplexer {
    pub fn new() -> Self {
        Self { state: Mutex::new(MultiplexerState::default()) }
    }

    /// Fail the next `create_session` call.
    pub fn fail_next_create(&self) {
        self.state.lock().fail_next_create = true;
    }

    /// Replace a session's screen content.
    pub fn set_screen(&self, session: &str, content: &str) {
        self.state.lock().screens.insert(session.to_string(), content.to_string());
    }

    /// Current screen content, if the session is alive.
    pub fn screen(&self, session: &str) -> Option<String> {
        self.state.lock().screens.get(session).cloned()
    }

    /// Simulate the session's process (or container) dying.
    pub fn terminate(&self, session: &str) {
        self.state.lock().screens.remove(session);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MultiplexerCall> {
        self.state.lock().calls.clone()
    }

    /// Keystrokes sent to a session, in order.
    pub fn sent_keys(&self, session: &str) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MultiplexerCall::SendKeys { session: s, data } if s == session => {
                    Some(data.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for FakeMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalMultiplexer for FakeMultiplexer {
    async fn create_session(
        &self,
        container: &str,
        session: &str,
    ) -> Result<(), MultiplexerError> {
        let mut state = self.state.lock();
        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(MultiplexerError::CommandFailed("simulated create failure".to_string()));
        }
        state.calls.push(MultiplexerCall::Create {
            container: container.to_string(),
            session: session.to_string(),
        });
        state.screens.insert(session.to_string(), "$ ".to_string());
        Ok(())
    }

    async fn send_keys(
        &self,
        _container: &str,
        session: &str,
        data: &str,
    ) -> Result<(), MultiplexerError> {
        let mut state = self.state.lock();
        match state.screens.get_mut(session) {
            Some(screen) => screen.push_str(data),
            None => return Err(MultiplexerError::SessionGone(session.to_string())),
        }
        state
            .calls
            .push(MultiplexerCall::SendKeys { session: session.to_string(), data: data.to_string() });
        Ok(())
    }

    async fn capture_pane(
        &self,
        _container: &str,
        session: &str,
    ) -> Result<String, MultiplexerError> {
        self.state
            .lock()
            .screens
            .get(session)
            .cloned()
            .ok_or_else(|| MultiplexerError::SessionGone(session.to_string()))
    }

    async fn kill_session(&self, _container: &str, session: &str) -> Result<(), MultiplexerError> {
        let mut state = self.state.lock();
        state.screens.remove(session);
        state.calls.push(MultiplexerCall::Kill { session: session.to_string() });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

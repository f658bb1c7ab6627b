// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session snapshot broadcast and input arbitration.
//!
//! Rather than streaming output diffs, each session has one capture
//! loop that periodically reads the entire visible pane and pushes the
//! full snapshot to every viewer, who replaces their display wholesale.
//! A viewer that missed any number of frames converges on the next one;
//! a just-attached viewer needs no replay buffer. There is no diff
//! repair logic anywhere in this module, on purpose.
//!
//! Multiple concurrent writers in collaborative mode are not
//! serialized — keystrokes interleave in arrival order, exactly as if
//! several people shared one keyboard. That is accepted behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use coterm_adapters::{MultiplexerError, TerminalMultiplexer};
use coterm_core::{ClientId, Role, TerminalSessionId};

use crate::error::ApiError;
use crate::registry::TerminalRegistry;

/// Depth of each viewer's send queue. A viewer that falls this many
/// snapshots behind is dropped rather than allowed to backpressure the
/// capture loop.
const SEND_QUEUE_DEPTH: usize = 32;

/// Close reason pushed when the underlying session dies.
pub const REASON_SESSION_TERMINATED: &str = "session terminated";

/// A frame delivered to a viewer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Full pane content — the viewer replaces its display, never appends.
    Snapshot(String),
    /// Terminal notice; no further frames follow.
    Closed { reason: String },
}

/// Live viewer connection handle, returned by [`PtyBroadcastHub::attach`].
///
/// Holds nothing but the frame receiver and identity — it is never the
/// source of truth for terminal content.
#[derive(Debug)]
pub struct ViewerHandle {
    pub session_id: TerminalSessionId,
    pub conn_id: u64,
    pub client_id: ClientId,
    pub rx: mpsc::Receiver<Frame>,
}

struct Viewer {
    client_id: ClientId,
    tx: mpsc::Sender<Frame>,
}

/// Fan-out state for one terminal session: an owned viewer set and one
/// capture loop, torn down together via the cancellation token.
struct SessionChannel {
    container: String,
    mux_session: String,
    viewers: Mutex<HashMap<u64, Viewer>>,
    next_conn: AtomicU64,
    cancel: CancellationToken,
}

/// Snapshot broadcast hub for all terminal sessions.
pub struct PtyBroadcastHub {
    registry: Arc<TerminalRegistry>,
    multiplexer: Arc<dyn TerminalMultiplexer>,
    tick: Duration,
    channels: Mutex<HashMap<TerminalSessionId, Arc<SessionChannel>>>,
}

impl PtyBroadcastHub {
    pub fn new(
        registry: Arc<TerminalRegistry>,
        multiplexer: Arc<dyn TerminalMultiplexer>,
        tick: Duration,
    ) -> Self {
        Self { registry, multiplexer, tick, channels: Mutex::new(HashMap::new()) }
    }

    /// Attach a viewer to a session's broadcast.
    ///
    /// Pushes an immediate out-of-band snapshot to the new connection so
    /// it does not wait for the next tick. The connection role is
    /// derived fresh on every input message, never here.
    pub async fn attach(
        self: &Arc<Self>,
        session_id: &TerminalSessionId,
        client_id: ClientId,
    ) -> Result<ViewerHandle, ApiError> {
        let session = self
            .registry
            .get(session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        // The viewer is registered while the channels lock is held, so a
        // concurrent close_all either drains this viewer or has already
        // removed the channel and a fresh one is created here.
        let (tx, rx) = mpsc::channel(SEND_QUEUE_DEPTH);
        let (channel, conn_id) = {
            let mut channels = self.channels.lock();
            let channel = Arc::clone(channels.entry(session_id.clone()).or_insert_with(|| {
                let channel = Arc::new(SessionChannel {
                    container: session.container.clone(),
                    mux_session: session.multiplexer_session.clone(),
                    viewers: Mutex::new(HashMap::new()),
                    next_conn: AtomicU64::new(0),
                    cancel: CancellationToken::new(),
                });
                tokio::spawn(run_capture_loop(
                    Arc::clone(self),
                    session_id.clone(),
                    Arc::clone(&channel),
                ));
                channel
            }));
            let conn_id = channel.next_conn.fetch_add(1, Ordering::Relaxed) + 1;
            channel
                .viewers
                .lock()
                .insert(conn_id, Viewer { client_id: client_id.clone(), tx: tx.clone() });
            (channel, conn_id)
        };

        info!(session_id = %session_id, conn_id, client_id = %client_id, "viewer attached");

        // Out-of-band snapshot; if the session is already gone the
        // capture loop will notice and close everyone shortly.
        if let Ok(content) =
            self.multiplexer.capture_pane(&channel.container, &channel.mux_session).await
        {
            let _ = tx.try_send(Frame::Snapshot(content));
        }

        Ok(ViewerHandle {
            session_id: session_id.clone(),
            conn_id,
            client_id,
            rx,
        })
    }

    /// Detach a viewer. Idempotent — double-detach is a no-op.
    pub fn detach(&self, session_id: &TerminalSessionId, conn_id: u64) {
        let channel = self.channels.lock().get(session_id).cloned();
        if let Some(channel) = channel {
            if channel.viewers.lock().remove(&conn_id).is_some() {
                debug!(session_id = %session_id, conn_id, "viewer detached");
            }
        }
    }

    /// Submit keystrokes on behalf of a client.
    ///
    /// Role is recomputed from the session record per message, so a mode
    /// flip applies to connections attached long before it. Spectator
    /// input is dropped silently — not an error. A genuine adapter write
    /// failure is surfaced to the submitting caller only.
    pub async fn submit_input(
        &self,
        session_id: &TerminalSessionId,
        client_id: &ClientId,
        data: &str,
    ) -> Result<(), ApiError> {
        let session = self
            .registry
            .get(session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        if session.role_of(client_id) == Role::Spectator {
            debug!(session_id = %session_id, client_id = %client_id, "spectator input dropped");
            return Ok(());
        }

        self.multiplexer
            .send_keys(&session.container, &session.multiplexer_session, data)
            .await
            .map_err(|e| ApiError::Adapter(e.to_string()))
    }

    /// Push a terminal notice to every viewer of a session, disconnect
    /// them, and stop the capture loop. Used on workspace stop, explicit
    /// session delete, and session death.
    pub fn close_all(&self, session_id: &TerminalSessionId, reason: &str) {
        let channel = self.channels.lock().remove(session_id);
        let Some(channel) = channel else { return };

        channel.cancel.cancel();
        let viewers: Vec<Viewer> = channel.viewers.lock().drain().map(|(_, v)| v).collect();
        let count = viewers.len();
        for viewer in viewers {
            let _ = viewer.tx.try_send(Frame::Closed { reason: reason.to_string() });
            // Dropping the sender ends the viewer's stream after the notice
        }
        info!(session_id = %session_id, viewers = count, reason, "session broadcast closed");
    }

    /// Number of currently attached viewers.
    pub fn viewer_count(&self, session_id: &TerminalSessionId) -> usize {
        self.channels
            .lock()
            .get(session_id)
            .map(|c| c.viewers.lock().len())
            .unwrap_or(0)
    }

    /// Capture one snapshot and fan it out. Returns false when the
    /// underlying session is gone and the channel was closed.
    async fn tick_once(
        self: &Arc<Self>,
        session_id: &TerminalSessionId,
        channel: &SessionChannel,
    ) -> bool {
        match self.multiplexer.capture_pane(&channel.container, &channel.mux_session).await {
            Ok(content) => {
                broadcast(session_id, channel, content);
                true
            }
            Err(MultiplexerError::SessionGone(reason)) => {
                warn!(session_id = %session_id, %reason, "terminal session gone");
                self.close_all(session_id, REASON_SESSION_TERMINATED);
                self.registry.forget(session_id);
                false
            }
            Err(e) => {
                // Transient capture failure — viewers self-heal on the
                // next successful tick.
                warn!(session_id = %session_id, error = %e, "capture failed");
                true
            }
        }
    }
}

/// Push a snapshot to every viewer of a channel.
///
/// The viewer lock is held only to copy the sender list — never across
/// a send — so one slow viewer cannot block attach/detach. A viewer
/// whose queue is full (or whose receiver is gone) is dropped.
fn broadcast(session_id: &TerminalSessionId, channel: &SessionChannel, content: String) {
    let targets: Vec<(u64, mpsc::Sender<Frame>)> = channel
        .viewers
        .lock()
        .iter()
        .map(|(id, v)| (*id, v.tx.clone()))
        .collect();

    let mut stale = Vec::new();
    for (conn_id, tx) in targets {
        if tx.try_send(Frame::Snapshot(content.clone())).is_err() {
            stale.push(conn_id);
        }
    }

    if !stale.is_empty() {
        let mut viewers = channel.viewers.lock();
        for conn_id in stale {
            if viewers.remove(&conn_id).is_some() {
                warn!(session_id = %session_id, conn_id, "slow viewer dropped");
            }
        }
    }
}

/// Capture loop for one session; runs until cancelled or the session dies.
async fn run_capture_loop(
    hub: Arc<PtyBroadcastHub>,
    session_id: TerminalSessionId,
    channel: Arc<SessionChannel>,
) {
    loop {
        tokio::select! {
            _ = channel.cancel.cancelled() => break,
            _ = tokio::time::sleep(hub.tick) => {}
        }
        if !hub.tick_once(&session_id, &channel).await {
            break;
        }
    }
    debug!(session_id = %session_id, "capture loop stopped");
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;

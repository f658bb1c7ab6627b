// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket attach endpoint.
//!
//! Bridges one socket to one hub viewer: a write task drains the
//! viewer's frame queue into the socket, the read loop feeds keystrokes
//! back through the hub. Snapshots go out as text frames the client
//! renders wholesale; teardown arrives as a close frame carrying the
//! reason.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use coterm_core::{ClientId, TerminalSessionId};

use crate::hub::{Frame, ViewerHandle};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AttachQuery {
    /// Opaque client id; defaults to `anonymous` when absent.
    pub client: Option<String>,
}

/// `GET /ws/terminals/{tid}?client=` — upgrade and attach.
pub async fn attach(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(tid): Path<String>,
    Query(query): Query<AttachQuery>,
) -> Response {
    let tid = TerminalSessionId::from_string(tid);
    let client = query
        .client
        .filter(|s| !s.is_empty())
        .map(ClientId::from)
        .unwrap_or_else(|| ClientId::from("anonymous"));

    // Attach before upgrading so an unknown session is a plain 404
    // instead of an accepted-then-dropped socket.
    match state.hub.attach(&tid, client).await {
        Ok(handle) => ws.on_upgrade(move |socket| run_connection(state, socket, handle)),
        Err(e) => e.into_response(),
    }
}

async fn run_connection(state: AppState, socket: WebSocket, handle: ViewerHandle) {
    let session_id = handle.session_id.clone();
    let conn_id = handle.conn_id;
    let client_id = handle.client_id.clone();
    let mut rx = handle.rx;

    let (mut sink, mut stream) = socket.split();

    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Frame::Snapshot(content) => {
                    if sink.send(Message::Text(content)).await.is_err() {
                        break;
                    }
                }
                Frame::Closed { reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let data = match message {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Message::Close(_) => break,
            // Ping/pong handled by axum itself
            _ => continue,
        };
        if let Err(e) = state.hub.submit_input(&session_id, &client_id, &data).await {
            warn!(session_id = %session_id, conn_id, error = %e, "input rejected");
            break;
        }
    }

    state.hub.detach(&session_id, conn_id);
    write_task.abort();
    debug!(session_id = %session_id, conn_id, "connection closed");
}

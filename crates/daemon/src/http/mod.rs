// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP and WebSocket surface.
//!
//! Thin handlers over the manager, registry, and hub — no business
//! rules live here beyond translating transport to operations. Client
//! identity arrives as an opaque id in the `x-coterm-client` header
//! (REST) or the `client` query parameter (WebSocket attach); issuing
//! those ids is someone else's job.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

use coterm_core::ClientId;

use crate::hub::PtyBroadcastHub;
use crate::manager::WorkspaceManager;
use crate::registry::TerminalRegistry;

mod attach;
mod terminals;
mod workspaces;

/// Header carrying the caller's opaque client id.
pub const CLIENT_HEADER: &str = "x-coterm-client";

/// Fallback identity for callers that send no client id.
const ANONYMOUS: &str = "anonymous";

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<WorkspaceManager>,
    pub registry: Arc<TerminalRegistry>,
    pub hub: Arc<PtyBroadcastHub>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/workspaces",
            post(workspaces::create).get(workspaces::list),
        )
        .route(
            "/workspaces/:id",
            get(workspaces::show).delete(workspaces::stop),
        )
        .route("/workspaces/:id/heartbeat", post(workspaces::heartbeat))
        .route(
            "/workspaces/:id/terminals",
            post(terminals::create).get(terminals::list),
        )
        .route(
            "/workspaces/:id/terminals/:tid",
            axum::routing::patch(terminals::set_mode).delete(terminals::remove),
        )
        .route("/ws/terminals/:tid", get(attach::attach))
        .with_state(state)
}

/// Resolve the caller's identity from request headers.
fn client_id(headers: &HeaderMap) -> ClientId {
    headers
        .get(CLIENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(ClientId::from)
        .unwrap_or_else(|| ClientId::from(ANONYMOUS))
}

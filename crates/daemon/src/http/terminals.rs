// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal session endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use coterm_core::{TerminalMode, TerminalSession, TerminalSessionId, WorkspaceId, WorkspaceStatus};

use crate::error::ApiError;
use crate::hub::REASON_SESSION_TERMINATED;

use super::{client_id, AppState};

#[derive(Debug, Deserialize)]
pub struct SetMode {
    pub mode: TerminalMode,
}

#[derive(Debug, Serialize)]
pub struct TerminalList {
    pub terminals: Vec<TerminalSession>,
}

/// `POST /workspaces/{id}/terminals` — 201 with the session; 404 for an
/// unknown workspace, 409 unless it is running.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TerminalSession>), ApiError> {
    let id = WorkspaceId::from_string(id);
    let workspace = state
        .manager
        .get(&id)
        .ok_or_else(|| ApiError::WorkspaceNotFound(id.to_string()))?;
    if workspace.status != WorkspaceStatus::Running {
        return Err(ApiError::WorkspaceNotRunning(id.to_string()));
    }

    let session = state.registry.create(&workspace, client_id(&headers)).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /workspaces/{id}/terminals`
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TerminalList>, ApiError> {
    let id = WorkspaceId::from_string(id);
    if state.manager.get(&id).is_none() {
        return Err(ApiError::WorkspaceNotFound(id.to_string()));
    }
    Ok(Json(TerminalList { terminals: state.registry.list(&id) }))
}

/// `PATCH /workspaces/{id}/terminals/{tid}` — flip collaborative /
/// readonly. Attached connections pick the new mode up on their next
/// input message; nobody is disconnected.
pub async fn set_mode(
    State(state): State<AppState>,
    Path((_id, tid)): Path<(String, String)>,
    Json(body): Json<SetMode>,
) -> Result<Json<TerminalSession>, ApiError> {
    let tid = TerminalSessionId::from_string(tid);
    let session = state.registry.set_mode(&tid, body.mode)?;
    Ok(Json(session))
}

/// `DELETE /workspaces/{id}/terminals/{tid}` — 204; viewers get a close
/// notice first.
pub async fn remove(
    State(state): State<AppState>,
    Path((_id, tid)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let tid = TerminalSessionId::from_string(tid);
    state.hub.close_all(&tid, REASON_SESSION_TERMINATED);
    state.registry.remove(&tid).await;
    Ok(StatusCode::NO_CONTENT)
}

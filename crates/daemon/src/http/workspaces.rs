// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lifecycle endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use coterm_core::{Workspace, WorkspaceId, WorkspaceScope};

use crate::error::ApiError;

use super::{client_id, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateWorkspace {
    pub scope: WorkspaceScope,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Scope key filter, e.g. `project:acme` or `global`.
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceList {
    pub workspaces: Vec<Workspace>,
}

/// `POST /workspaces` — launch a workspace; 201 with the record still
/// in `starting`, 409 if the scope already has an active one.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateWorkspace>,
) -> Result<(StatusCode, Json<Workspace>), ApiError> {
    let workspace = state.manager.launch(body.scope, client_id(&headers))?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

/// `GET /workspaces[?scope=]`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<WorkspaceList> {
    let workspaces = state.manager.list(query.scope.as_deref());
    Json(WorkspaceList { workspaces })
}

/// `GET /workspaces/{id}` — clients poll this while the workspace is
/// starting.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Workspace>, ApiError> {
    let id = WorkspaceId::from_string(id);
    state
        .manager
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::WorkspaceNotFound(id.to_string()))
}

/// `POST /workspaces/{id}/heartbeat` — 204; only a running workspace is
/// touched.
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = WorkspaceId::from_string(id);
    state.manager.record_heartbeat(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /workspaces/{id}` — 204, idempotent.
pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = WorkspaceId::from_string(id);
    state.manager.stop(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API error taxonomy.
//!
//! Adapter-level failures are translated into these variants at each
//! component boundary; raw adapter errors never cross the
//! manager/registry/hub API surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors surfaced by daemon operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An active workspace already exists for the scope key; callers
    /// should fetch the existing one instead of creating.
    #[error("an active workspace already exists for scope {0}")]
    ScopeConflict(String),

    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("terminal session not found: {0}")]
    SessionNotFound(String),

    /// Terminals can only be created against a running workspace.
    #[error("workspace not running: {0}")]
    WorkspaceNotRunning(String),

    #[error("no free workspace ports in configured range")]
    PortsExhausted,

    /// Container or multiplexer backend failure, post-retry.
    #[error("adapter failure: {0}")]
    Adapter(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ScopeConflict(_) | ApiError::WorkspaceNotRunning(_) => StatusCode::CONFLICT,
            ApiError::WorkspaceNotFound(_) | ApiError::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::PortsExhausted => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Adapter(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

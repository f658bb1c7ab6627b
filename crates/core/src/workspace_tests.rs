// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn workspace_id_has_prefix() {
    let id = WorkspaceId::new();
    assert!(id.as_str().starts_with("wks-"));
    assert_eq!(id.suffix().len(), 19);
}

#[test]
fn workspace_id_serde_is_transparent() {
    let id = WorkspaceId::from_string("wks-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"wks-abc\"");

    let parsed: WorkspaceId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[parameterized(
    project = { WorkspaceScope::Project("p1".into()), "project:p1" },
    user = { WorkspaceScope::User("u1".into()), "user:u1" },
    global = { WorkspaceScope::Global, "global" },
)]
fn scope_key(scope: WorkspaceScope, expected: &str) {
    assert_eq!(scope.scope_key(), expected);
}

#[test]
fn scope_serde_round_trip() {
    let scope = WorkspaceScope::Project("p1".into());
    let json = serde_json::to_string(&scope).unwrap();
    assert_eq!(json, r#"{"kind":"project","key":"p1"}"#);
    let parsed: WorkspaceScope = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, scope);
}

#[test]
fn status_display() {
    assert_eq!(WorkspaceStatus::Starting.to_string(), "starting");
    assert_eq!(WorkspaceStatus::Running.to_string(), "running");
    assert_eq!(WorkspaceStatus::Stopping.to_string(), "stopping");
    assert_eq!(WorkspaceStatus::Stopped.to_string(), "stopped");
    assert_eq!(
        WorkspaceStatus::Error { reason: "docker run failed".to_string() }.to_string(),
        "error: docker run failed"
    );
}

#[parameterized(
    starting = { WorkspaceStatus::Starting, true },
    running = { WorkspaceStatus::Running, true },
    stopping = { WorkspaceStatus::Stopping, true },
    stopped = { WorkspaceStatus::Stopped, false },
    error = { WorkspaceStatus::Error { reason: String::new() }, false },
)]
fn active_states(status: WorkspaceStatus, active: bool) {
    assert_eq!(status.is_active(), active);
}

#[test]
fn new_workspace_starts_in_starting() {
    let ws = Workspace::new(WorkspaceScope::Global, "alice".into(), 42);
    assert_eq!(ws.status, WorkspaceStatus::Starting);
    assert!(ws.container.is_none());
    assert!(ws.port.is_none());
    assert_eq!(ws.created_at_ms, 42);
    assert_eq!(ws.last_heartbeat_ms, 42);
}

#[test]
fn status_serde_snake_case() {
    let json = serde_json::to_string(&WorkspaceStatus::Running).unwrap();
    assert_eq!(json, "\"running\"");
    let err: WorkspaceStatus =
        serde_json::from_str(r#"{"error":{"reason":"boom"}}"#).unwrap();
    assert_eq!(err, WorkspaceStatus::Error { reason: "boom".to_string() });
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

use coterm_adapters::{FakeMultiplexer, MultiplexerCall};
use coterm_core::{ClientId, FakeClock, TerminalMode, Workspace, WorkspaceScope};

fn setup() -> (TerminalRegistry, Arc<FakeMultiplexer>) {
    let multiplexer = Arc::new(FakeMultiplexer::new());
    let registry = TerminalRegistry::new(multiplexer.clone(), Arc::new(FakeClock::new()));
    (registry, multiplexer)
}

fn running_workspace() -> Workspace {
    let mut workspace =
        Workspace::new(WorkspaceScope::Global, ClientId::from("alice"), 1_000_000);
    workspace.status = coterm_core::WorkspaceStatus::Running;
    workspace.container = Some("coterm-ws-abc".to_string());
    workspace.port = Some(9400);
    workspace
}

#[tokio::test]
async fn create_starts_multiplexer_session_in_workspace_container() {
    let (registry, multiplexer) = setup();
    let workspace = running_workspace();

    let session =
        registry.create(&workspace, ClientId::from("alice")).await.unwrap();

    assert_eq!(session.workspace_id, workspace.id);
    assert_eq!(session.container, "coterm-ws-abc");
    assert_eq!(session.owner_id, "alice");
    assert_eq!(session.mode, TerminalMode::Collaborative);
    assert_eq!(
        multiplexer.calls(),
        vec![MultiplexerCall::Create {
            container: "coterm-ws-abc".to_string(),
            session: session.multiplexer_session.clone(),
        }]
    );
}

#[tokio::test]
async fn create_without_container_is_not_running() {
    let (registry, _multiplexer) = setup();
    let mut workspace = running_workspace();
    workspace.container = None;

    let err = registry.create(&workspace, ClientId::from("alice")).await.unwrap_err();
    assert!(matches!(err, ApiError::WorkspaceNotRunning(_)));
}

#[tokio::test]
async fn create_surfaces_multiplexer_failure_without_a_record() {
    let (registry, multiplexer) = setup();
    multiplexer.fail_next_create();

    let workspace = running_workspace();
    let err = registry.create(&workspace, ClientId::from("alice")).await.unwrap_err();
    assert!(matches!(err, ApiError::Adapter(_)));
    assert!(registry.list(&workspace.id).is_empty());
}

#[tokio::test]
async fn list_is_scoped_to_workspace() {
    let (registry, _multiplexer) = setup();
    let first = running_workspace();
    let second = running_workspace();

    let a = registry.create(&first, ClientId::from("alice")).await.unwrap();
    let b = registry.create(&first, ClientId::from("bob")).await.unwrap();
    let _other = registry.create(&second, ClientId::from("carol")).await.unwrap();

    let sessions = registry.list(&first.id);
    assert_eq!(sessions.len(), 2);
    let ids: Vec<_> = sessions.iter().map(|s| s.id.clone()).collect();
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
}

#[tokio::test]
async fn set_mode_preserves_session_identity() {
    let (registry, _multiplexer) = setup();
    let session =
        registry.create(&running_workspace(), ClientId::from("alice")).await.unwrap();

    let readonly = registry.set_mode(&session.id, TerminalMode::Readonly).unwrap();
    assert_eq!(readonly.mode, TerminalMode::Readonly);
    let back = registry.set_mode(&session.id, TerminalMode::Collaborative).unwrap();

    assert_eq!(back.mode, TerminalMode::Collaborative);
    assert_eq!(back.multiplexer_session, session.multiplexer_session);
    assert_eq!(back.owner_id, session.owner_id);
}

#[test]
fn set_mode_unknown_session_is_not_found() {
    let (registry, _multiplexer) = setup();
    let err = registry
        .set_mode(&coterm_core::TerminalSessionId::new(), TerminalMode::Readonly)
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionNotFound(_)));
}

#[tokio::test]
async fn remove_kills_the_multiplexer_session() {
    let (registry, multiplexer) = setup();
    let session =
        registry.create(&running_workspace(), ClientId::from("alice")).await.unwrap();

    let removed = registry.remove(&session.id).await;
    assert!(removed.is_some());
    assert!(registry.get(&session.id).is_none());
    assert!(multiplexer
        .calls()
        .contains(&MultiplexerCall::Kill { session: session.multiplexer_session.clone() }));
}

#[tokio::test]
async fn remove_absent_session_is_noop() {
    let (registry, multiplexer) = setup();
    assert!(registry.remove(&coterm_core::TerminalSessionId::new()).await.is_none());
    assert!(multiplexer.calls().is_empty());
}

#[tokio::test]
async fn remove_for_workspace_clears_only_that_workspace() {
    let (registry, _multiplexer) = setup();
    let mine = running_workspace();
    let other = running_workspace();
    registry.create(&mine, ClientId::from("alice")).await.unwrap();
    registry.create(&mine, ClientId::from("bob")).await.unwrap();
    let kept = registry.create(&other, ClientId::from("carol")).await.unwrap();

    assert_eq!(registry.remove_for_workspace(&mine.id).await, 2);
    assert!(registry.list(&mine.id).is_empty());
    assert!(registry.get(&kept.id).is_some());
}

#[tokio::test]
async fn forget_drops_record_without_touching_multiplexer() {
    let (registry, multiplexer) = setup();
    let session =
        registry.create(&running_workspace(), ClientId::from("alice")).await.unwrap();
    let calls_before = multiplexer.calls().len();

    registry.forget(&session.id);
    assert!(registry.get(&session.id).is_none());
    assert_eq!(multiplexer.calls().len(), calls_before);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn session_name_derives_from_id() {
    let session = TerminalSession::new(WorkspaceId::new(), "coterm-ws-x", "alice".into(), 0);
    assert_eq!(session.multiplexer_session, format!("term-{}", session.id.short(8)));
    assert_eq!(session.mode, TerminalMode::Collaborative);
}

#[parameterized(
    collaborative_owner = { TerminalMode::Collaborative, "alice", Role::Writer },
    collaborative_other = { TerminalMode::Collaborative, "bob", Role::Writer },
    readonly_owner = { TerminalMode::Readonly, "alice", Role::Writer },
    readonly_other = { TerminalMode::Readonly, "bob", Role::Spectator },
)]
fn role_derivation(mode: TerminalMode, client: &str, expected: Role) {
    let owner = ClientId::new("alice");
    assert_eq!(role_for(mode, &owner, &client.into()), expected);
}

#[test]
fn role_follows_mode_changes() {
    let mut session = TerminalSession::new(WorkspaceId::new(), "c", "alice".into(), 0);
    let bob = ClientId::new("bob");

    assert_eq!(session.role_of(&bob), Role::Writer);
    session.mode = TerminalMode::Readonly;
    assert_eq!(session.role_of(&bob), Role::Spectator);
    assert_eq!(session.role_of(&session.owner_id.clone()), Role::Writer);
}

#[test]
fn mode_toggle_preserves_identity() {
    let mut session = TerminalSession::new(WorkspaceId::new(), "c", "alice".into(), 0);
    let name = session.multiplexer_session.clone();
    let owner = session.owner_id.clone();

    session.mode = TerminalMode::Readonly;
    session.mode = TerminalMode::Collaborative;
    session.mode = TerminalMode::Readonly;

    assert_eq!(session.multiplexer_session, name);
    assert_eq!(session.owner_id, owner);
}

#[test]
fn mode_serde_snake_case() {
    assert_eq!(serde_json::to_string(&TerminalMode::Readonly).unwrap(), "\"readonly\"");
    let parsed: TerminalMode = serde_json::from_str("\"collaborative\"").unwrap();
    assert_eq!(parsed, TerminalMode::Collaborative);
}

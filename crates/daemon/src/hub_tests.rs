// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use coterm_adapters::FakeMultiplexer;
use coterm_core::{FakeClock, TerminalMode, TerminalSession, Workspace, WorkspaceScope};

const TICK: Duration = Duration::from_millis(20);

struct Harness {
    registry: Arc<TerminalRegistry>,
    multiplexer: Arc<FakeMultiplexer>,
    hub: Arc<PtyBroadcastHub>,
}

async fn setup_session() -> (Harness, TerminalSession) {
    let multiplexer = Arc::new(FakeMultiplexer::new());
    let registry = Arc::new(TerminalRegistry::new(
        Arc::clone(&multiplexer) as Arc<dyn TerminalMultiplexer>,
        Arc::new(FakeClock::new()),
    ));
    let hub = Arc::new(PtyBroadcastHub::new(
        Arc::clone(&registry),
        Arc::clone(&multiplexer) as Arc<dyn TerminalMultiplexer>,
        TICK,
    ));

    let mut workspace =
        Workspace::new(WorkspaceScope::Global, ClientId::from("owner"), 1_000_000);
    workspace.status = coterm_core::WorkspaceStatus::Running;
    workspace.container = Some("coterm-ws-abc".to_string());
    let session = registry.create(&workspace, ClientId::from("owner")).await.unwrap();

    (Harness { registry, multiplexer, hub }, session)
}

/// Drain frames until a snapshot with the wanted content arrives.
async fn await_snapshot(handle: &mut ViewerHandle, want: &str) {
    while let Some(frame) = handle.rx.recv().await {
        match frame {
            Frame::Snapshot(content) if content == want => return,
            Frame::Snapshot(_) => continue,
            Frame::Closed { reason } => panic!("closed instead: {}", reason),
        }
    }
    panic!("stream ended before snapshot {:?}", want);
}

#[tokio::test(start_paused = true)]
async fn attach_delivers_an_immediate_snapshot() {
    let (h, session) = setup_session().await;
    h.multiplexer.set_screen(&session.multiplexer_session, "$ make test");

    let mut viewer = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();
    await_snapshot(&mut viewer, "$ make test").await;
}

#[tokio::test]
async fn attach_unknown_session_is_not_found() {
    let (h, _session) = setup_session().await;
    let err = h
        .hub
        .attach(&TerminalSessionId::new(), ClientId::from("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn all_viewers_converge_on_the_same_snapshot() {
    let (h, session) = setup_session().await;
    let mut alice = h.hub.attach(&session.id, ClientId::from("alice")).await.unwrap();
    let mut bob = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();
    assert_eq!(h.hub.viewer_count(&session.id), 2);

    h.multiplexer.set_screen(&session.multiplexer_session, "$ cargo build\nFinished");

    await_snapshot(&mut alice, "$ cargo build\nFinished").await;
    await_snapshot(&mut bob, "$ cargo build\nFinished").await;
}

#[tokio::test(start_paused = true)]
async fn collaborative_mode_accepts_input_from_any_client() {
    let (h, session) = setup_session().await;

    h.hub.submit_input(&session.id, &ClientId::from("guest"), "ls\n").await.unwrap();

    assert_eq!(h.multiplexer.sent_keys(&session.multiplexer_session), vec!["ls\n"]);
}

#[tokio::test(start_paused = true)]
async fn readonly_mode_drops_non_owner_input_silently() {
    let (h, session) = setup_session().await;
    h.registry.set_mode(&session.id, TerminalMode::Readonly).unwrap();
    let screen_before = h.multiplexer.screen(&session.multiplexer_session);

    // Silently accepted, zero effect
    h.hub.submit_input(&session.id, &ClientId::from("guest"), "rm -rf /\n").await.unwrap();

    assert!(h.multiplexer.sent_keys(&session.multiplexer_session).is_empty());
    assert_eq!(h.multiplexer.screen(&session.multiplexer_session), screen_before);

    // The owner still writes
    h.hub.submit_input(&session.id, &ClientId::from("owner"), "whoami\n").await.unwrap();
    assert_eq!(h.multiplexer.sent_keys(&session.multiplexer_session), vec!["whoami\n"]);
}

#[tokio::test(start_paused = true)]
async fn mode_flip_applies_to_already_attached_connections() {
    let (h, session) = setup_session().await;
    let _viewer = h.hub.attach(&session.id, ClientId::from("guest")).await.unwrap();

    h.hub.submit_input(&session.id, &ClientId::from("guest"), "a").await.unwrap();
    h.registry.set_mode(&session.id, TerminalMode::Readonly).unwrap();
    h.hub.submit_input(&session.id, &ClientId::from("guest"), "b").await.unwrap();
    h.registry.set_mode(&session.id, TerminalMode::Collaborative).unwrap();
    h.hub.submit_input(&session.id, &ClientId::from("guest"), "c").await.unwrap();

    assert_eq!(h.multiplexer.sent_keys(&session.multiplexer_session), vec!["a", "c"]);
}

#[tokio::test]
async fn submit_input_unknown_session_is_not_found() {
    let (h, _session) = setup_session().await;
    let err = h
        .hub
        .submit_input(&TerminalSessionId::new(), &ClientId::from("x"), "ls")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SessionNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn detach_is_idempotent() {
    let (h, session) = setup_session().await;
    let viewer = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();

    h.hub.detach(&session.id, viewer.conn_id);
    h.hub.detach(&session.id, viewer.conn_id);
    assert_eq!(h.hub.viewer_count(&session.id), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_viewer_is_dropped_not_waited_for() {
    let (h, session) = setup_session().await;
    // Never read from this one
    let _stalled = h.hub.attach(&session.id, ClientId::from("zombie")).await.unwrap();
    let mut healthy = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();

    for _ in 0..500 {
        if h.hub.viewer_count(&session.id) == 1 {
            break;
        }
        // Keep the healthy viewer draining so only the stalled one fills up
        let _ = healthy.rx.try_recv();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.hub.viewer_count(&session.id), 1);
}

#[tokio::test(start_paused = true)]
async fn session_death_closes_viewers_and_forgets_the_record() {
    let (h, session) = setup_session().await;
    let mut viewer = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();

    h.multiplexer.terminate(&session.multiplexer_session);

    let mut reason = None;
    while let Some(frame) = viewer.rx.recv().await {
        if let Frame::Closed { reason: r } = frame {
            reason = Some(r);
            break;
        }
    }
    assert_eq!(reason.as_deref(), Some(REASON_SESSION_TERMINATED));

    // Record is gone without a multiplexer kill (nothing left to kill)
    for _ in 0..100 {
        if h.registry.get(&session.id).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(h.registry.get(&session.id).is_none());
}

#[tokio::test(start_paused = true)]
async fn close_all_notifies_every_viewer_once() {
    let (h, session) = setup_session().await;
    let mut alice = h.hub.attach(&session.id, ClientId::from("alice")).await.unwrap();
    let mut bob = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();

    h.hub.close_all(&session.id, "workspace stopped");
    // Double close is a no-op
    h.hub.close_all(&session.id, "workspace stopped");

    for viewer in [&mut alice, &mut bob] {
        let mut reason = None;
        while let Some(frame) = viewer.rx.recv().await {
            if let Frame::Closed { reason: r } = frame {
                reason = Some(r);
                break;
            }
        }
        assert_eq!(reason.as_deref(), Some("workspace stopped"));
    }
    assert_eq!(h.hub.viewer_count(&session.id), 0);
}

#[tokio::test(start_paused = true)]
async fn every_viewer_is_either_drained_by_close_all_or_on_a_live_channel() {
    let (h, session) = setup_session().await;
    let mut first = h.hub.attach(&session.id, ClientId::from("alice")).await.unwrap();

    h.hub.close_all(&session.id, "workspace stopped");

    // The first viewer was registered before the close, so it must get
    // the notice and end; it can never be left hanging on a channel the
    // hub no longer knows about.
    let mut reason = None;
    while let Some(frame) = first.rx.recv().await {
        if let Frame::Closed { reason: r } = frame {
            reason = Some(r);
            break;
        }
    }
    assert_eq!(reason.as_deref(), Some("workspace stopped"));

    // An attach after the close lands on a fresh channel with its own
    // capture loop and keeps receiving snapshots.
    let mut second = h.hub.attach(&session.id, ClientId::from("bob")).await.unwrap();
    assert_eq!(h.hub.viewer_count(&session.id), 1);
    h.multiplexer.set_screen(&session.multiplexer_session, "$ ls");
    await_snapshot(&mut second, "$ ls").await;
}

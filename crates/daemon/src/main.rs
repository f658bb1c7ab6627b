// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cotermd — ephemeral workspace daemon.
//!
//! Wiring order matters: adapters first, then the session registry and
//! broadcast hub, then the workspace manager that orchestrates both. A
//! stale container sweep runs before the listener opens so leftovers
//! from a crashed run never collide with fresh launches.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coterm_adapters::{ContainerRuntime, DockerRuntime, TerminalMultiplexer, TmuxMultiplexer};
use coterm_core::{Clock, SystemClock};
use coterm_daemon::http::{router, AppState};
use coterm_daemon::{Config, HeartbeatReaper, PtyBroadcastHub, TerminalRegistry, WorkspaceManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(addr = %config.http_addr, image = %config.image, "cotermd starting");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::new());
    let multiplexer: Arc<dyn TerminalMultiplexer> =
        Arc::new(TmuxMultiplexer::new(config.capture_lines));

    let registry = Arc::new(TerminalRegistry::new(
        Arc::clone(&multiplexer),
        Arc::clone(&clock),
    ));
    let hub = Arc::new(PtyBroadcastHub::new(
        Arc::clone(&registry),
        Arc::clone(&multiplexer),
        config.tick,
    ));
    let manager = Arc::new(WorkspaceManager::new(
        runtime,
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::clone(&clock),
        &config,
    ));

    let cleaned = manager.clean_stale_containers().await;
    if cleaned > 0 {
        info!(cleaned, "removed containers left by a previous run");
    }

    let shutdown = CancellationToken::new();
    let reaper = HeartbeatReaper::new(
        Arc::clone(&manager),
        Arc::clone(&clock),
        config.idle_timeout,
        config.reap_interval,
    );
    tokio::spawn(reaper.run(shutdown.clone()));

    let app = router(AppState { manager, registry, hub });
    let listener = TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    info!("cotermd stopped");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
    shutdown.cancel();
}

//! Debug HTTP server surfaced only in debug feature builds.
//!
//! This module spawns a lightweight Axum server that exposes the player
//! snapshot, an SSE snapshot stream, telemetry, and player command endpoints
//! for driving the coordinator without the app UI.

#[cfg(all(feature = "debug_http", debug_assertions))]
mod routes;
#[cfg(all(feature = "debug_http", debug_assertions))]
mod sse;

use std::sync::Arc;

use crate::coordinator::SessionCoordinator;

#[cfg(all(feature = "debug_http", debug_assertions))]
pub use routes::{build_router, run_http_server, DebugHttpState};

#[cfg(all(feature = "debug_http", debug_assertions))]
use log::{error, info, warn};
#[cfg(all(feature = "debug_http", debug_assertions))]
use std::net::SocketAddr;
#[cfg(all(feature = "debug_http", debug_assertions))]
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(all(feature = "debug_http", debug_assertions))]
static SERVER_STARTED: AtomicBool = AtomicBool::new(false);

/// Bind address from `BINAURAL_DEBUG_HTTP_ADDR`, defaulting to 127.0.0.1:8787.
#[cfg(all(feature = "debug_http", debug_assertions))]
pub fn debug_addr() -> SocketAddr {
    std::env::var("BINAURAL_DEBUG_HTTP_ADDR")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)))
}

/// Access token from `BINAURAL_DEBUG_TOKEN`, defaulting to `binaural-debug`.
#[cfg(all(feature = "debug_http", debug_assertions))]
pub fn debug_token() -> String {
    std::env::var("BINAURAL_DEBUG_TOKEN").unwrap_or_else(|_| "binaural-debug".to_string())
}

/// Spawn the debug HTTP server only when the feature flag and debug builds are enabled.
///
/// Runs on a dedicated thread with its own runtime; the coordinator's tasks
/// stay on the runtime that created it.
pub fn spawn_if_enabled(coordinator: Arc<SessionCoordinator>) {
    #[cfg(all(feature = "debug_http", debug_assertions))]
    {
        if SERVER_STARTED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Debug HTTP server already running");
            return;
        }

        let addr = debug_addr();
        let token = debug_token();
        let preview = token.chars().take(4).collect::<String>();

        let spawned = std::thread::Builder::new()
            .name("binaural-debug-http".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!("Failed to build tokio runtime for debug HTTP server: {}", err);
                        return;
                    }
                };

                info!(
                    "Debug HTTP server binding {} (token prefix {}***)",
                    addr, preview
                );

                runtime.block_on(async move {
                    let state = DebugHttpState::new(coordinator, token);
                    if let Err(err) = run_http_server(state, addr).await {
                        error!("Debug HTTP server stopped: {:#}", err);
                    }
                });
            });

        if let Err(err) = spawned {
            error!("Failed to spawn debug HTTP thread: {}", err);
            SERVER_STARTED.store(false, Ordering::SeqCst);
        }
    }

    #[cfg(not(all(feature = "debug_http", debug_assertions)))]
    {
        let _ = coordinator;
    }
}

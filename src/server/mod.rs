// HTTP surface - Axum JSON API over the action handlers and playback session
// Optionally serves a built web UI from a static directory.

pub mod playback;
pub mod routes;

use axum::{extract::DefaultBodyLimit, http::Method, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use crate::ai::MusicModel;
use crate::commands::PlaybackSession;
use crate::config::ServerConfig;

// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state for every request
pub struct ServerState {
    pub model: Arc<dyn MusicModel>,
    pub playback: PlaybackSession,
    pub max_upload_bytes: usize,
}

/// Holds the running server's shutdown mechanism
pub struct RunningServer {
    pub shutdown_tx: oneshot::Sender<()>,
    pub addr: SocketAddr,
    pub handle: tokio::task::JoinHandle<()>,
}

impl RunningServer {
    /// Signal shutdown and wait for in-flight requests to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            error!("[server] Server task failed: {}", e);
        }
    }
}

/// Build the router: API routes, CORS, body limit, and the optional static UI.
pub fn router(state: Arc<ServerState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .merge(routes::api_routes())
        .merge(playback::playback_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    let app = match static_dir.filter(|p| p.is_dir()) {
        Some(dir) => {
            info!("[server] Serving web UI from {:?}", dir);
            let index = dir.join("index.html");
            api.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)))
        }
        None => {
            info!("[server] No static UI configured, API-only mode");
            api
        }
    };

    app.layer(cors)
}

/// Start the HTTP server. Returns the running server handle (for shutdown).
pub async fn start_server(
    config: &ServerConfig,
    state: Arc<ServerState>,
) -> Result<RunningServer, String> {
    let static_dir = Some(config.static_dir.trim())
        .filter(|d| !d.is_empty())
        .map(PathBuf::from);
    let app = router(state, static_dir);

    let listener = try_bind(&config.host, config.port).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local addr: {}", e))?;

    info!("[server] Listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("[server] Shutdown signal received, draining connections...");
            })
            .await;
        if let Err(e) = result {
            error!("[server] Server error: {}", e);
        }
        info!("[server] Server stopped");
    });

    Ok(RunningServer {
        shutdown_tx,
        addr,
        handle,
    })
}

/// Bind the preferred port, then the next ten, then whatever the OS assigns.
async fn try_bind(host: &str, preferred_port: u16) -> Result<TcpListener, String> {
    if let Ok(listener) = TcpListener::bind((host, preferred_port)).await {
        return Ok(listener);
    }

    for offset in 1..=10u16 {
        let Some(port) = preferred_port.checked_add(offset) else {
            break;
        };
        if let Ok(listener) = TcpListener::bind((host, port)).await {
            warn!("[server] Port {} unavailable, using {}", preferred_port, port);
            return Ok(listener);
        }
    }

    let listener = TcpListener::bind((host, 0u16))
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", host, e))?;
    warn!("[server] All preferred ports unavailable, OS assigned a port");
    Ok(listener)
}


#[cfg(test)]
mod tests {
    use super::test_support::{spawn, spawn_with};
    use super::*;
    use crate::ai::testing::FakeModel;

    #[tokio::test]
    async fn test_binds_os_port_and_stops() {
        let (server, base) = spawn(FakeModel::default()).await;
        assert_ne!(server.addr.port(), 0);

        let body: serde_json::Value = reqwest::get(format!("{}/api/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["name"], "TuneDetective");
        assert_eq!(body["provider"], "fake");

        server.stop().await;
        assert!(reqwest::get(format!("{}/api/status", base)).await.is_err());
    }

    #[tokio::test]
    async fn test_falls_back_when_port_taken() {
        let taken = TcpListener::bind(("127.0.0.1", 0u16)).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = try_bind("127.0.0.1", port).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_static_dir_falls_back_to_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>TuneDetective</h1>").unwrap();

        let (server, base) =
            spawn_with(FakeModel::default(), &dir.path().to_string_lossy()).await;

        let page = reqwest::get(format!("{}/some/client/route", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("TuneDetective"));

        server.stop().await;
    }
}

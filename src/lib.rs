// Modules
pub mod ai;
pub mod commands;
pub mod config;
pub mod errors;
pub mod player;
pub mod server;
pub mod song;
pub mod upload;

use std::sync::Arc;

use ai::MusicModel;
use commands::PlaybackSession;
use config::Config;
use player::Playlist;
use server::ServerState;

/// Serve the HTTP API until `shutdown` resolves, then drain and stop.
pub async fn serve(
    cfg: &Config,
    model: Arc<dyn MusicModel>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<(), String> {
    let state = Arc::new(ServerState {
        model,
        playback: PlaybackSession::new(Playlist::starter(), &cfg.playback),
        max_upload_bytes: cfg.server.max_upload_bytes,
    });

    let running = server::start_server(&cfg.server, state).await?;
    shutdown.await;
    running.stop().await;
    Ok(())
}

// Playback control routes
// Thin wrappers over the shared `PlaybackSession`; each returns the new snapshot.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::ServerState;
use crate::player::PlaybackSnapshot;

#[derive(Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

pub fn playback_routes() -> Router<Arc<ServerState>> {
    Router::new()
        .route("/api/playback", get(get_playback))
        .route("/api/playback/select", post(select))
        .route("/api/playback/toggle", post(toggle))
        .route("/api/playback/next", post(next))
        .route("/api/playback/prev", post(prev))
}

async fn get_playback(State(state): State<Arc<ServerState>>) -> Json<PlaybackSnapshot> {
    Json(state.playback.snapshot())
}

async fn select(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<SelectRequest>,
) -> Json<PlaybackSnapshot> {
    Json(state.playback.select(body.index))
}

async fn toggle(State(state): State<Arc<ServerState>>) -> Json<PlaybackSnapshot> {
    Json(state.playback.toggle())
}

async fn next(State(state): State<Arc<ServerState>>) -> Json<PlaybackSnapshot> {
    Json(state.playback.next())
}

async fn prev(State(state): State<Arc<ServerState>>) -> Json<PlaybackSnapshot> {
    Json(state.playback.prev())
}

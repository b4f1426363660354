// REST API routes for the AI actions
// Every action answers with its UI state shape; failures set `error` and pick
// the status code from the error kind.

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::ServerState;
use crate::commands::ai::{
    analyze_song, file_too_large, get_emotion_recommendations, get_recommendations,
    EmotionFailure,
};
use crate::commands::{AnalysisState, EmotionState, RecommendationState};
use crate::errors::{ActionError, ErrorKind};
use crate::player::Playlist;
use crate::upload::Upload;

// ---- Request/Response types ----

#[derive(Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub provider: String,
}

// ---- Route registration ----

pub fn api_routes() -> Router<Arc<ServerState>> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/playlist", get(get_playlist))
        .route("/api/recommendations", post(post_recommendations))
        .route("/api/analyze", post(post_analyze))
        .route("/api/emotion", post(post_emotion))
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::External => StatusCode::BAD_GATEWAY,
        ErrorKind::EmptyResult => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn status_of(error: Option<&ActionError>) -> StatusCode {
    error.map_or(StatusCode::OK, |e| status_for(e.kind))
}

// ---- Handlers ----

async fn get_status(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: "TuneDetective".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.model.name().to_string(),
    })
}

async fn get_playlist(State(state): State<Arc<ServerState>>) -> Json<Playlist> {
    Json(state.playback.playlist())
}

async fn post_recommendations(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<RecommendRequest>,
) -> (StatusCode, Json<RecommendationState>) {
    let result = get_recommendations(state.model.as_ref(), &body.prompt).await;

    if let Ok(rec) = &result {
        state.playback.replace_playlist(Playlist {
            songs: rec.songs.clone(),
            description: rec.description.clone(),
        });
    }

    let view = RecommendationState::from(result);
    (status_of(view.error.as_ref()), Json(view))
}

async fn post_analyze(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> (StatusCode, Json<AnalysisState>) {
    let result = match read_upload(multipart, "audioFile", state.max_upload_bytes).await {
        Ok(upload) => analyze_song(state.model.as_ref(), upload.as_ref(), state.max_upload_bytes).await,
        Err(e) => Err(e),
    };

    let view = AnalysisState::from(result);
    (status_of(view.error.as_ref()), Json(view))
}

async fn post_emotion(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> (StatusCode, Json<EmotionState>) {
    let result = match read_upload(multipart, "imageFile", state.max_upload_bytes).await {
        Ok(upload) => {
            get_emotion_recommendations(state.model.as_ref(), upload.as_ref(), state.max_upload_bytes)
                .await
        }
        Err(error) => Err(EmotionFailure { text: None, error }),
    };

    if let Ok(rec) = &result {
        state.playback.replace_playlist(Playlist {
            songs: rec.songs.clone(),
            description: rec.description.clone(),
        });
    }

    let view = EmotionState::from(result);
    (status_of(view.error.as_ref()), Json(view))
}

/// Pull the file in form field `name` out of a multipart body. Other fields
/// are skipped. A body over the size limit becomes a validation error.
async fn read_upload(
    mut multipart: Multipart,
    name: &'static str,
    max_bytes: usize,
) -> Result<Option<Upload>, ActionError> {
    let unreadable = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            file_too_large(name, max_bytes)
        } else {
            warn!("[server] Unreadable multipart body: {}", e.body_text());
            ActionError::validation(name, "The uploaded file could not be read.")
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some(name) {
            continue;
        }
        let upload = field_to_upload(field).await.map_err(unreadable)?;
        info!(
            "[server] Received {} ({} bytes, {})",
            name,
            upload.len(),
            upload.mime_type
        );
        return Ok(Some(upload));
    }

    Ok(None)
}

async fn field_to_upload(
    field: Field<'_>,
) -> Result<Upload, axum::extract::multipart::MultipartError> {
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = field.file_name().map(str::to_string);
    let bytes = field.bytes().await?;

    let mut upload = Upload::new(mime_type, bytes.to_vec());
    upload.file_name = file_name;
    Ok(upload)
}

// Action handlers for the AI features
//
// Provides:
// - Prompt → playlist recommendations (with a generated description)
// - Audio clip → song identification
// - Image text → emotion → playlist
//
// Each handler validates its input, runs the model calls strictly in
// sequence, and reports failures as `ActionError`s. Nothing is retried.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::ai::{Emotion, MusicModel, SongMetadata};
use crate::errors::ActionError;
use crate::song::{parse_recommendations, Song, SongRef};
use crate::upload::{DataUri, Upload, AUDIO_MIME_TYPES, IMAGE_MIME_TYPES};

pub const MIN_PROMPT_CHARS: usize = 3;

/// Songs plus the model's description of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub songs: Vec<Song>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmotionRecommendation {
    pub text: String,
    pub emotion: Emotion,
    pub songs: Vec<Song>,
    pub description: String,
}

/// Emotion flow failure. `text` is whatever was extracted before the
/// failure, so the UI can still show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmotionFailure {
    pub text: Option<String>,
    pub error: ActionError,
}

// ─── UI-facing result shapes ───

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs: Option<Vec<Song>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SongMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs: Option<Vec<Song>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

impl From<Result<Recommendation, ActionError>> for RecommendationState {
    fn from(result: Result<Recommendation, ActionError>) -> Self {
        match result {
            Ok(rec) => Self {
                songs: Some(rec.songs),
                description: Some(rec.description),
                error: None,
            },
            Err(error) => Self {
                error: Some(error),
                ..Self::default()
            },
        }
    }
}

impl From<Result<SongMetadata, ActionError>> for AnalysisState {
    fn from(result: Result<SongMetadata, ActionError>) -> Self {
        match result {
            Ok(metadata) => Self {
                metadata: Some(metadata),
                error: None,
            },
            Err(error) => Self {
                metadata: None,
                error: Some(error),
            },
        }
    }
}

impl From<Result<EmotionRecommendation, EmotionFailure>> for EmotionState {
    fn from(result: Result<EmotionRecommendation, EmotionFailure>) -> Self {
        match result {
            Ok(rec) => Self {
                songs: Some(rec.songs),
                description: Some(rec.description),
                text: Some(rec.text),
                emotion: Some(rec.emotion),
                error: None,
            },
            Err(failure) => Self {
                text: failure.text,
                error: Some(failure.error),
                ..Self::default()
            },
        }
    }
}

// ─── Handlers ───

/// Recommend songs for a free-text prompt.
pub async fn get_recommendations(
    model: &dyn MusicModel,
    prompt: &str,
) -> Result<Recommendation, ActionError> {
    let prompt = prompt.trim();
    if prompt.chars().count() < MIN_PROMPT_CHARS {
        return Err(ActionError::validation(
            "prompt",
            "Prompt must be at least 3 characters long.",
        ));
    }

    songs_and_description(model, prompt).await
}

/// Recommend → parse → describe. Shared by the prompt and emotion flows.
async fn songs_and_description(
    model: &dyn MusicModel,
    prompt: &str,
) -> Result<Recommendation, ActionError> {
    let recommendations = model.recommend(prompt).await.map_err(|e| {
        error!("[ai] recommendation failed: {}", e);
        ActionError::external("An unexpected error occurred with the AI service.")
    })?;

    if recommendations.is_empty() {
        return Err(ActionError::empty(
            "Could not generate recommendations. Try a different prompt.",
        ));
    }

    let songs = parse_recommendations(&recommendations);
    if songs.is_empty() {
        warn!(
            "[ai] none of {} recommendations matched \"Title by Artist\"",
            recommendations.len()
        );
        return Err(ActionError::empty(
            "AI returned recommendations in an unexpected format. Please try again.",
        ));
    }

    let refs: Vec<SongRef<'_>> = songs.iter().map(Song::song_ref).collect();
    let description = model
        .describe_playlist(&refs, Some(prompt))
        .await
        .map_err(|e| {
            error!("[ai] playlist description failed: {}", e);
            ActionError::external("An unexpected error occurred with the AI service.")
        })?;

    info!("[ai] {} songs recommended", songs.len());
    Ok(Recommendation { songs, description })
}

pub fn file_too_large(field: &'static str, max_bytes: usize) -> ActionError {
    ActionError::validation(
        field,
        format!(
            "File is too large. The limit is {:.1} MB.",
            max_bytes as f64 / (1024.0 * 1024.0)
        ),
    )
}

/// Validate an upload and encode it under its canonical MIME type.
fn check_upload(
    upload: Option<&Upload>,
    field: &'static str,
    missing: &str,
    allowed: &[&'static str],
    wrong_type: &str,
    max_bytes: usize,
) -> Result<DataUri, ActionError> {
    let upload = match upload {
        Some(u) if !u.is_empty() => u,
        _ => return Err(ActionError::validation(field, missing)),
    };

    if upload.len() > max_bytes {
        return Err(file_too_large(field, max_bytes));
    }

    let mime_type = upload
        .canonical_mime(allowed)
        .ok_or_else(|| ActionError::validation(field, wrong_type))?;

    Ok(DataUri::encode(mime_type, &upload.bytes))
}

/// Identify the song in an audio clip.
pub async fn analyze_song(
    model: &dyn MusicModel,
    audio: Option<&Upload>,
    max_bytes: usize,
) -> Result<SongMetadata, ActionError> {
    let audio = check_upload(
        audio,
        "audioFile",
        "Please select an audio file.",
        AUDIO_MIME_TYPES,
        "Invalid file type. Please upload an MP3, WAV, or OGG file.",
        max_bytes,
    )?;

    let metadata = model
        .extract_song_metadata(&audio)
        .await
        .map_err(|e| {
            error!("[ai] song analysis failed: {}", e);
            ActionError::external(
                "Could not analyze song. The audio might not be recognized or the file may be too large.",
            )
        })?;

    if metadata.artist.is_empty() || metadata.title.is_empty() {
        return Err(ActionError::empty(
            "Could not identify song. Please try a different audio file.",
        ));
    }

    info!("[ai] identified \"{}\" by {}", metadata.title, metadata.artist);
    Ok(metadata)
}

/// Read the text in an image, detect its emotion, and build a playlist for it.
pub async fn get_emotion_recommendations(
    model: &dyn MusicModel,
    image: Option<&Upload>,
    max_bytes: usize,
) -> Result<EmotionRecommendation, EmotionFailure> {
    let fail = |text: Option<String>, error: ActionError| EmotionFailure { text, error };

    let image = check_upload(
        image,
        "imageFile",
        "Please select an image file.",
        IMAGE_MIME_TYPES,
        "Invalid file type. Please upload a JPG, PNG, or WebP file.",
        max_bytes,
    )
    .map_err(|e| fail(None, e))?;

    let text = model
        .extract_text_from_image(&image)
        .await
        .map_err(|e| {
            error!("[ai] text extraction failed: {}", e);
            fail(None, ActionError::external("An unexpected error occurred."))
        })?;

    if text.is_empty() {
        return Err(fail(
            Some(text),
            ActionError::empty("No text could be found in the image."),
        ));
    }

    let emotion = model.detect_emotion(&text).await.map_err(|e| {
        error!("[ai] emotion detection failed: {}", e);
        fail(
            Some(text.clone()),
            ActionError::external("An unexpected error occurred."),
        )
    })?;
    info!("[ai] detected emotion: {}", emotion);

    let Recommendation { songs, description } = songs_and_description(model, emotion.as_str())
        .await
        .map_err(|e| fail(Some(text.clone()), e))?;

    Ok(EmotionRecommendation {
        text,
        emotion,
        songs,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeModel;
    use crate::errors::ErrorKind;

    const MAX: usize = 1024;

    #[tokio::test]
    async fn test_short_prompt_is_rejected_without_calls() {
        let model = FakeModel::with_songs(&["\"A\" by B"]);
        let err = get_recommendations(&model, "  hi ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field, Some("prompt"));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_recommendations_then_description() {
        let model = FakeModel::with_songs(&[
            "\"Bohemian Rhapsody\" by Queen",
            "not a song",
            "\"Dreams\" by Fleetwood Mac",
        ]);
        let rec = get_recommendations(&model, "classic rock").await.unwrap();
        assert_eq!(rec.songs.len(), 2);
        assert_eq!(rec.songs[0].title, "Bohemian Rhapsody");
        assert_eq!(rec.description, "Great tunes.");
        assert_eq!(
            model.calls(),
            vec!["recommend:classic rock", "describe:2:classic rock"]
        );
    }

    #[tokio::test]
    async fn test_no_recommendations_is_empty_result() {
        let model = FakeModel::with_songs(&[]);
        let err = get_recommendations(&model, "anything").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyResult);
        assert_eq!(
            err.message,
            "Could not generate recommendations. Try a different prompt."
        );
        assert_eq!(model.calls(), vec!["recommend:anything"]);
    }

    #[tokio::test]
    async fn test_unparseable_recommendations() {
        let model = FakeModel::with_songs(&["one", "two"]);
        let err = get_recommendations(&model, "anything").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyResult);
        assert!(err.message.contains("unexpected format"));
    }

    #[tokio::test]
    async fn test_model_failure_is_external() {
        let model = FakeModel {
            fail_recommend: true,
            ..FakeModel::default()
        };
        let state = RecommendationState::from(get_recommendations(&model, "anything").await);
        assert_eq!(state.error.unwrap().kind, ErrorKind::External);
        assert!(state.songs.is_none());
    }

    #[tokio::test]
    async fn test_analyze_requires_file_and_audio_type() {
        let model = FakeModel::default();

        let err = analyze_song(&model, None, MAX).await.unwrap_err();
        assert_eq!(err.message, "Please select an audio file.");

        let empty = Upload::new("audio/mpeg", Vec::new());
        let err = analyze_song(&model, Some(&empty), MAX).await.unwrap_err();
        assert_eq!(err.message, "Please select an audio file.");

        let flac = Upload::new("audio/flac", vec![1, 2, 3]);
        let err = analyze_song(&model, Some(&flac), MAX).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.starts_with("Invalid file type"));

        let big = Upload::new("audio/mpeg", vec![0; MAX + 1]);
        let err = analyze_song(&model, Some(&big), MAX).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_identifies_song() {
        let model = FakeModel {
            metadata: SongMetadata {
                artist: "Queen".to_string(),
                title: "Bohemian Rhapsody".to_string(),
            },
            ..FakeModel::default()
        };
        let clip = Upload::new("audio/wav", b"RIFF".to_vec());
        let meta = analyze_song(&model, Some(&clip), MAX).await.unwrap();
        assert_eq!(meta.artist, "Queen");
        assert_eq!(model.calls(), vec!["metadata:audio/wav"]);
    }

    #[tokio::test]
    async fn test_upload_reaches_model_with_canonical_mime() {
        let model = FakeModel {
            metadata: SongMetadata {
                artist: "Queen".to_string(),
                title: "Bohemian Rhapsody".to_string(),
            },
            text: "so happy".to_string(),
            ..FakeModel::with_songs(&["\"Happy\" by Pharrell Williams"])
        };

        let clip = Upload::new("Audio/MPEG", b"ID3".to_vec());
        analyze_song(&model, Some(&clip), MAX).await.unwrap();

        let image = Upload::new("image/png; charset=binary", b"\x89PNG".to_vec());
        get_emotion_recommendations(&model, Some(&image), MAX)
            .await
            .unwrap();

        let calls = model.calls();
        assert_eq!(calls[0], "metadata:audio/mpeg");
        assert_eq!(calls[1], "text:image/png");
    }

    #[tokio::test]
    async fn test_analyze_missing_title_is_empty_result() {
        let model = FakeModel {
            metadata: SongMetadata {
                artist: "Queen".to_string(),
                title: String::new(),
            },
            ..FakeModel::default()
        };
        let clip = Upload::new("audio/mp3", b"ID3".to_vec());
        let state = AnalysisState::from(analyze_song(&model, Some(&clip), MAX).await);
        let err = state.error.unwrap();
        assert_eq!(err.kind, ErrorKind::EmptyResult);
        assert!(state.metadata.is_none());
    }

    #[tokio::test]
    async fn test_emotion_without_text_stops_early() {
        let model = FakeModel::with_songs(&["\"A\" by B"]);
        let image = Upload::new("image/png", b"\x89PNG".to_vec());

        let failure = get_emotion_recommendations(&model, Some(&image), MAX)
            .await
            .unwrap_err();
        assert_eq!(failure.text.as_deref(), Some(""));
        assert_eq!(failure.error.message, "No text could be found in the image.");
        assert_eq!(model.calls(), vec!["text:image/png"]);

        let state = EmotionState::from(Err::<EmotionRecommendation, _>(failure));
        assert_eq!(state.text.as_deref(), Some(""));
        assert!(state.emotion.is_none());
    }

    #[tokio::test]
    async fn test_emotion_feeds_label_into_recommendations() {
        let model = FakeModel {
            text: "What a wonderful day!".to_string(),
            ..FakeModel::with_songs(&["\"Happy\" by Pharrell Williams"])
        };
        let image = Upload::new("image/jpeg", b"\xff\xd8".to_vec());

        let rec = get_emotion_recommendations(&model, Some(&image), MAX)
            .await
            .unwrap();
        assert_eq!(rec.emotion, Emotion::Happy);
        assert_eq!(rec.text, "What a wonderful day!");
        assert_eq!(rec.songs[0].artist, "Pharrell Williams");
        assert_eq!(
            model.calls(),
            vec![
                "text:image/jpeg",
                "emotion:What a wonderful day!",
                "recommend:happy",
                "describe:1:happy",
            ]
        );
    }

    #[tokio::test]
    async fn test_emotion_rejects_wrong_image_type() {
        let model = FakeModel::default();
        let gif = Upload::new("image/gif", b"GIF89a".to_vec());
        let failure = get_emotion_recommendations(&model, Some(&gif), MAX)
            .await
            .unwrap_err();
        assert_eq!(failure.error.kind, ErrorKind::Validation);
        assert_eq!(failure.text, None);
        assert!(model.calls().is_empty());
    }

    #[test]
    fn test_state_json_omits_absent_fields() {
        let state =
            RecommendationState::from(Err::<Recommendation, _>(ActionError::validation("prompt", "short")));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("songs").is_none());
        assert_eq!(json["error"]["field"], "prompt");
    }
}

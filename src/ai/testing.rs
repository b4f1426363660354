// In-process stand-in for the hosted model, shared by unit tests

use async_trait::async_trait;
use std::sync::Mutex;

use super::provider::{Emotion, ModelError, MusicModel, SongMetadata};
use crate::song::SongRef;
use crate::upload::DataUri;

/// Fake model with canned answers that records which capabilities ran.
#[derive(Default)]
pub struct FakeModel {
    pub recommendations: Vec<String>,
    pub fail_recommend: bool,
    pub metadata: SongMetadata,
    pub text: String,
    pub emotion: Option<Emotion>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn with_songs(songs: &[&str]) -> Self {
        Self {
            recommendations: songs.iter().map(|s| s.to_string()).collect(),
            emotion: Some(Emotion::Happy),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl MusicModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn recommend(&self, prompt: &str) -> Result<Vec<String>, ModelError> {
        self.record(format!("recommend:{}", prompt));
        if self.fail_recommend {
            return Err(ModelError::Transport("offline".to_string()));
        }
        Ok(self.recommendations.clone())
    }

    async fn describe_playlist(
        &self,
        songs: &[SongRef<'_>],
        prompt: Option<&str>,
    ) -> Result<String, ModelError> {
        self.record(format!("describe:{}:{}", songs.len(), prompt.unwrap_or("")));
        Ok("Great tunes.".to_string())
    }

    async fn extract_song_metadata(&self, audio: &DataUri) -> Result<SongMetadata, ModelError> {
        self.record(format!("metadata:{}", audio.mime_type()));
        Ok(self.metadata.clone())
    }

    async fn extract_text_from_image(&self, image: &DataUri) -> Result<String, ModelError> {
        self.record(format!("text:{}", image.mime_type()));
        Ok(self.text.clone())
    }

    async fn detect_emotion(&self, text: &str) -> Result<Emotion, ModelError> {
        self.record(format!("emotion:{}", text));
        self.emotion
            .ok_or_else(|| ModelError::Malformed("no emotion".to_string()))
    }
}

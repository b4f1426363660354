// Model capability boundary
//
// `MusicModel` is the only thing the action handlers know about the hosted
// model. `PromptedModel` implements it on top of any `ModelBackend` (a raw
// "prompt in, text out" completion call) by rendering the prompt templates and
// decoding the JSON each template asks for.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::prompts;
use crate::song::SongRef;
use crate::upload::DataUri;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("API request failed: {0}")]
    Transport(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Malformed(String),

    #[error("{backend} does not accept {what} input")]
    Unsupported { backend: &'static str, what: String },

    #[error("No API key configured for {0}")]
    MissingApiKey(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        ModelError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Malformed(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Neutral,
    Fear,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Neutral,
        Emotion::Fear,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Neutral => "neutral",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == wanted)
            .ok_or_else(|| ModelError::Malformed(format!("unknown emotion '{}'", s)))
    }
}

/// Artist/title pair identified from an audio clip. Either field may come
/// back empty when the model does not recognise the song.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMetadata {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
}

/// The five model capabilities TuneDetective relies on.
#[async_trait]
pub trait MusicModel: Send + Sync {
    /// Provider name, for logs and the status endpoint.
    fn name(&self) -> &str;

    /// Recommendations formatted as `"Title" by Artist`.
    async fn recommend(&self, prompt: &str) -> Result<Vec<String>, ModelError>;

    /// Short (at most two sentences) description of a playlist.
    async fn describe_playlist(
        &self,
        songs: &[SongRef<'_>],
        prompt: Option<&str>,
    ) -> Result<String, ModelError>;

    async fn extract_song_metadata(&self, audio: &DataUri) -> Result<SongMetadata, ModelError>;

    /// Text visible in the image; empty when there is none.
    async fn extract_text_from_image(&self, image: &DataUri) -> Result<String, ModelError>;

    async fn detect_emotion(&self, text: &str) -> Result<Emotion, ModelError>;
}

/// A single prompt → text completion against a hosted model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        attachment: Option<&DataUri>,
    ) -> Result<String, ModelError>;
}

#[derive(Debug, Deserialize)]
struct RecommendOutput {
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeOutput {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ExtractTextOutput {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmotionOutput {
    emotion: String,
}

/// `MusicModel` built from prompt templates over a completion backend.
pub struct PromptedModel<B> {
    backend: B,
}

impl<B: ModelBackend> PromptedModel<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        prompt: &str,
        attachment: Option<&DataUri>,
    ) -> Result<T, ModelError> {
        let reply = self.backend.complete(prompt, attachment).await?;
        debug!(backend = self.backend.name(), reply_len = reply.len(), "[model] reply received");
        let json = extract_json(&reply)?;
        Ok(serde_json::from_str::<T>(&json)?)
    }
}

#[async_trait]
impl<B: ModelBackend> MusicModel for PromptedModel<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn recommend(&self, prompt: &str) -> Result<Vec<String>, ModelError> {
        let out: RecommendOutput = self.ask(&prompts::recommend_songs(prompt), None).await?;
        Ok(out.recommendations)
    }

    async fn describe_playlist(
        &self,
        songs: &[SongRef<'_>],
        prompt: Option<&str>,
    ) -> Result<String, ModelError> {
        let out: DescribeOutput = self
            .ask(&prompts::describe_playlist(songs, prompt), None)
            .await?;
        Ok(out.description.trim().to_string())
    }

    async fn extract_song_metadata(&self, audio: &DataUri) -> Result<SongMetadata, ModelError> {
        let out: SongMetadata = self
            .ask(prompts::EXTRACT_SONG_METADATA, Some(audio))
            .await?;
        Ok(SongMetadata {
            artist: out.artist.trim().to_string(),
            title: out.title.trim().to_string(),
        })
    }

    async fn extract_text_from_image(&self, image: &DataUri) -> Result<String, ModelError> {
        let out: ExtractTextOutput = self
            .ask(prompts::EXTRACT_TEXT_FROM_IMAGE, Some(image))
            .await?;
        Ok(out.text.trim().to_string())
    }

    async fn detect_emotion(&self, text: &str) -> Result<Emotion, ModelError> {
        let out: EmotionOutput = self.ask(&prompts::detect_emotion(text), None).await?;
        out.emotion.parse()
    }
}

/// Extract JSON from response text (handles markdown code blocks)
pub fn extract_json(text: &str) -> Result<String, ModelError> {
    if let Some(start) = text.find("```json") {
        let json_start = start + "```json".len();
        if let Some(end) = text[json_start..].find("```") {
            return Ok(text[json_start..json_start + end].trim().to_string());
        }
    }

    if let Some(start) = text.find("```") {
        let json_start = start + 3;
        if let Some(end) = text[json_start..].find("```") {
            return Ok(text[json_start..json_start + end].trim().to_string());
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Ok(text[start..=end].trim().to_string());
        }
    }

    Err(ModelError::Malformed("No JSON found in response".to_string()))
}

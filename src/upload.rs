// Uploaded files and their data-URI encoding
//
// Uploads arrive either from a multipart form field or from a file on disk
// (headless CLI). Both end up as an `Upload` that is validated against an
// allow-list of MIME types and then encoded as `data:<mime>;base64,<payload>`
// before it is sent to the model. The encoded MIME is always the allow-list
// entry, never the client-supplied spelling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::path::Path;

pub const AUDIO_MIME_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/ogg", "audio/mp3"];
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Raw uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            file_name: path
                .file_name()
                .map(|f| f.to_string_lossy().to_string()),
            mime_type: mime_type_for_path(path).to_string(),
            bytes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// The entry of `allowed` this upload's MIME type matches. Case and
    /// parameters such as `; charset=...` are ignored, so `Image/PNG` maps
    /// to `image/png`.
    pub fn canonical_mime(&self, allowed: &[&'static str]) -> Option<&'static str> {
        let essence = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        allowed.iter().copied().find(|m| *m == essence)
    }
}

/// Get MIME type for an upload based on its file extension
pub fn mime_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// A base64 `data:` URI. Keeps the MIME type and payload separately
/// addressable because some model APIs want them as distinct fields.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    base64: String,
}

impl DataUri {
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            base64: STANDARD.encode(bytes),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

// Payloads can be megabytes; keep them out of debug logs.
impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUri")
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

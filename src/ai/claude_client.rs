// Claude API client
//
// Implements communication with Anthropic's Messages API as a
// `ModelBackend`: one user turn, optional base64 image block, text reply.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{ModelBackend, ModelError};
use crate::upload::DataUri;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const CLAUDE_VERSION: &str = "2023-06-01";

/// Message in a conversation
#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<RequestBlock>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RequestBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

/// Request to Claude API
#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

/// Response from Claude API
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

pub struct ClaudeClient {
    api_key: String,
    model: String,
    max_tokens: u32,
    client: Client,
    base_url: String,
}

impl ClaudeClient {
    /// Create a new Claude client with the given API key
    pub fn new(
        api_key: String,
        model: Option<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            client,
            base_url: CLAUDE_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(
        &self,
        prompt: &str,
        attachment: Option<&DataUri>,
    ) -> Result<ClaudeRequest<'_>, ModelError> {
        let mut content = Vec::with_capacity(2);

        if let Some(data) = attachment {
            if !data.is_image() {
                return Err(ModelError::Unsupported {
                    backend: "claude",
                    what: data.mime_type().to_string(),
                });
            }
            content.push(RequestBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: data.mime_type().to_string(),
                    data: data.base64().to_string(),
                },
            });
        }

        content.push(RequestBlock::Text {
            text: prompt.to_string(),
        });

        Ok(ClaudeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content,
            }],
        })
    }
}

#[async_trait]
impl ModelBackend for ClaudeClient {
    fn name(&self) -> &str {
        "claude"
    }

    async fn complete(
        &self,
        prompt: &str,
        attachment: Option<&DataUri>,
    ) -> Result<String, ModelError> {
        let request = self.build_request(prompt, attachment)?;

        let response = self
            .client
            .post(&self.base_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::Api { status, body });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        if claude_response.stop_reason.as_deref() == Some("max_tokens") {
            warn!("[claude] reply truncated at max_tokens={}", self.max_tokens);
        }

        Ok(collect_text(&claude_response.content))
    }
}

// Extract text from content blocks
fn collect_text(blocks: &[ContentBlock]) -> String {
    let text = blocks
        .iter()
        .filter(|block| block.block_type == "text")
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    debug!("[claude] {} content blocks, {} chars of text", blocks.len(), text.len());
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClaudeClient {
        ClaudeClient::new("sk-ant-test".to_string(), None, 512, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_text_only_request_shape() {
        let c = client();
        let req = c.build_request("hello", None).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][0]["text"], "hello");
    }

    #[test]
    fn test_image_block_precedes_text() {
        let c = client();
        let image = DataUri::encode("image/png", b"png");
        let req = c.build_request("read this", Some(&image)).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        let block = &json["messages"][0]["content"][0];
        assert_eq!(block["type"], "image");
        assert_eq!(block["source"]["type"], "base64");
        assert_eq!(block["source"]["media_type"], "image/png");
        assert_eq!(block["source"]["data"], image.base64());
        assert_eq!(json["messages"][0]["content"][1]["type"], "text");
    }

    #[test]
    fn test_audio_is_rejected() {
        let c = client();
        let audio = DataUri::encode("audio/mpeg", b"mp3");
        assert!(matches!(
            c.build_request("identify", Some(&audio)),
            Err(ModelError::Unsupported { backend: "claude", .. })
        ));
    }

    #[test]
    fn test_collect_text_skips_other_blocks() {
        let resp: ClaudeResponse = serde_json::from_str(
            r#"{"content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "1}"}
            ], "stop_reason": "end_turn"}"#,
        )
        .unwrap();
        assert_eq!(collect_text(&resp.content), "{\"a\":\n1}");
    }

    #[tokio::test]
    async fn test_complete_against_local_endpoint() {
        use axum::{http::HeaderMap, routing::post, Json, Router};

        async fn messages(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
            assert_eq!(headers["x-api-key"], "sk-ant-test");
            assert_eq!(headers["anthropic-version"], CLAUDE_VERSION);
            assert_eq!(body["messages"][0]["content"][0]["text"], "ping");
            Json(serde_json::json!({
                "content": [{"type": "text", "text": "{\"ok\": true}"}],
                "stop_reason": "end_turn"
            }))
        }

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0u16)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/v1/messages", post(messages)))
                .await
                .unwrap();
        });

        let c = client().with_base_url(format!("http://{}/v1/messages", addr));
        assert_eq!(c.complete("ping", None).await.unwrap(), "{\"ok\": true}");

        let missing = client().with_base_url(format!("http://{}/nope", addr));
        assert!(matches!(
            missing.complete("ping", None).await,
            Err(ModelError::Api { status: 404, .. })
        ));
    }
}

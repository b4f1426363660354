// AI module for hosted-model integration
//
// This module provides:
// - The `MusicModel` capability boundary and its prompt-driven implementation
// - Claude and Gemini HTTP backends
// - Secure credential storage via OS keychain
// - Prompt templates for each capability

pub mod claude_client;
pub mod credentials;
pub mod gemini_client;
pub mod prompts;
pub mod provider;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ModelConfig, Provider};

// Re-export commonly used types
pub use claude_client::ClaudeClient;
pub use credentials::CredentialManager;
pub use gemini_client::GeminiClient;
pub use provider::{Emotion, ModelBackend, ModelError, MusicModel, PromptedModel, SongMetadata};

/// Build the configured model. The API key has already been resolved.
pub fn build_model(config: &ModelConfig, api_key: String) -> Result<Arc<dyn MusicModel>, ModelError> {
    if api_key.trim().is_empty() {
        return Err(ModelError::MissingApiKey(config.provider.to_string()));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let model_name = Some(config.model.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let base_url = Some(config.base_url.trim()).filter(|u| !u.is_empty());

    Ok(match config.provider {
        Provider::Claude => {
            let mut client = ClaudeClient::new(api_key, model_name, config.max_tokens, timeout)?;
            if let Some(url) = base_url {
                client = client.with_base_url(url);
            }
            Arc::new(PromptedModel::new(client))
        }
        Provider::Gemini => {
            let mut client = GeminiClient::new(api_key, model_name, config.max_tokens, timeout)?;
            if let Some(url) = base_url {
                client = client.with_base_url(url);
            }
            Arc::new(PromptedModel::new(client))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_model_picks_provider() {
        let mut cfg = ModelConfig::default();
        let model = build_model(&cfg, "sk-ant-REDACTED".to_string()).unwrap();
        assert_eq!(model.name(), "claude");

        cfg.provider = Provider::Gemini;
        cfg.model = "gemini-1.5-pro".to_string();
        let model = build_model(&cfg, "AIza0123456789abcdefghij".to_string()).unwrap();
        assert_eq!(model.name(), "gemini");
    }

    #[test]
    fn test_build_model_requires_key() {
        let cfg = ModelConfig::default();
        assert!(matches!(
            build_model(&cfg, "   ".to_string()),
            Err(ModelError::MissingApiKey(p)) if p == "claude"
        ));
    }
}

// Secure credential storage for model API keys
//
// Uses OS-native secure storage:
// - macOS: Keychain
// - Windows: Credential Manager
// - Linux: Secret Service (GNOME/KDE)

use keyring::Entry;
use tracing::{debug, info, warn};

use crate::config::Provider;

const SERVICE_NAME: &str = "dev.tunedetective.app";

pub struct CredentialManager;

impl CredentialManager {
    /// Check the key looks like one the provider issues before storing it.
    pub fn validate_api_key(provider: Provider, key: &str) -> Result<(), String> {
        let key = key.trim();
        if key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        if provider == Provider::Claude && !key.starts_with("sk-ant-") {
            return Err(
                "Invalid API key format. Claude API keys should start with 'sk-ant-'".to_string(),
            );
        }

        if key.len() < 20 {
            return Err("API key appears too short. Please check and try again.".to_string());
        }

        Ok(())
    }

    fn entry(provider: Provider) -> Result<Entry, String> {
        Entry::new(SERVICE_NAME, provider.keyring_user())
            .map_err(|e| format!("Failed to access keychain: {}", e))
    }

    /// Store the provider's API key in the OS keychain
    pub fn store_api_key(provider: Provider, key: &str) -> Result<(), String> {
        Self::validate_api_key(provider, key)?;

        Self::entry(provider)?
            .set_password(key.trim())
            .map_err(|e| format!("Failed to store API key: {}", e))?;

        info!("[credentials] {} API key stored in keychain", provider);
        Ok(())
    }

    /// Retrieve the provider's API key from the OS keychain
    pub fn retrieve_api_key(provider: Provider) -> Result<Option<String>, String> {
        match Self::entry(provider)?.get_password() {
            Ok(key) => {
                debug!("[credentials] {} API key retrieved (length: {})", provider, key.len());
                Ok(Some(key))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("[credentials] no {} API key in keychain", provider);
                Ok(None)
            }
            Err(e) => {
                warn!("[credentials] failed to retrieve {} API key: {}", provider, e);
                Err(format!("Failed to retrieve API key: {}", e))
            }
        }
    }

    /// Delete the provider's API key from the OS keychain
    pub fn delete_api_key(provider: Provider) -> Result<(), String> {
        match Self::entry(provider)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(format!("Failed to delete API key: {}", e)),
        }
    }

    /// Check if an API key is stored (without returning it)
    pub fn has_api_key(provider: Provider) -> Result<bool, String> {
        Ok(Self::retrieve_api_key(provider)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_validation() {
        assert!(CredentialManager::validate_api_key(Provider::Claude, "sk-ant-api03-test123456").is_ok());
        assert!(CredentialManager::validate_api_key(Provider::Claude, "invalid-key-but-long-enough").is_err());
        assert!(CredentialManager::validate_api_key(Provider::Claude, "sk-ant-short").is_err());
        assert!(CredentialManager::validate_api_key(Provider::Gemini, "AIzaSyExampleExampleExample").is_ok());
        assert!(CredentialManager::validate_api_key(Provider::Gemini, "   ").is_err());
    }
}

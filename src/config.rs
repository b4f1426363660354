// Application configuration
//
// Stored as TOML under the platform config directory and created with
// defaults on first load. Every section is `#[serde(default)]` so partial
// files keep working as fields are added.

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::ai::CredentialManager;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with a built web UI, served at `/`. Empty for API-only mode.
    pub static_dir: String,
    /// Uploads larger than this are rejected before reaching the model.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Claude,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }

    /// Environment variable consulted when the config has no key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Claude => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn keyring_user(&self) -> &'static str {
        match self {
            Provider::Claude => "claude_api_key",
            Provider::Gemini => "gemini_api_key",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Provider::Claude),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: Provider,
    /// Model name; empty uses the provider default.
    pub model: String,
    /// API key; empty falls back to the environment, then the OS keychain.
    pub api_key: String,
    /// API base URL override, e.g. for a proxy. Empty uses the provider's.
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Timer period in milliseconds.
    pub tick_ms: u64,
    /// Progress added per tick, in percent.
    pub step: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9002,
            static_dir: String::new(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Claude,
            model: String::new(),
            api_key: String::new(),
            base_url: String::new(),
            timeout_secs: 60,
            max_tokens: 1024,
        }
    }
}

// 300 ms x 100 steps: a 30 second preview per song
impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: 300,
            step: 1,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "tunedetective", "tunedetective")
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = project_dirs().context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_config(cfg, &path)
}

fn write_config(cfg: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    // The file may hold an API key
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = Config::default();
        write_config(&cfg, &path)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Resolve the API key for the configured provider: config file, then the
/// provider's environment variable, then the OS keychain.
pub fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    resolve_api_key_with(
        cfg,
        |var| std::env::var(var).ok(),
        |provider| CredentialManager::retrieve_api_key(provider).ok().flatten(),
    )
}

fn resolve_api_key_with(
    cfg: &ModelConfig,
    env: impl Fn(&str) -> Option<String>,
    keychain: impl Fn(Provider) -> Option<String>,
) -> Option<String> {
    let non_empty = |s: String| {
        let s = s.trim().to_string();
        (!s.is_empty()).then_some(s)
    };

    non_empty(cfg.api_key.clone())
        .or_else(|| env(cfg.provider.env_var()).and_then(non_empty))
        .or_else(|| keychain(cfg.provider).and_then(non_empty))
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tunedetective_lib::ai::{self, CredentialManager, MusicModel};
use tunedetective_lib::commands::ai::{
    analyze_song, get_emotion_recommendations, get_recommendations,
};
use tunedetective_lib::config::{self, Config, Provider};
use tunedetective_lib::song::Song;
use tunedetective_lib::upload::Upload;

#[derive(Debug, Parser)]
#[command(
    name = "tunedetective",
    version,
    about = "Song recommendations, song identification and emotion playlists"
)]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
    },
    /// Recommend songs for a prompt and print them (headless).
    Recommend { prompt: String },
    /// Identify the song in an audio file (headless).
    Analyze { file: PathBuf },
    /// Build a playlist from the mood of the text in an image (headless).
    Emotion { file: PathBuf },
    /// Manage the model API key (OS keychain or config file).
    Auth {
        #[command(subcommand)]
        cmd: AuthCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AuthCommand {
    /// Store an API key.
    Set {
        key: String,
        /// claude or gemini. Defaults to the configured provider.
        #[arg(long)]
        provider: Option<Provider>,
        /// Write the key to the config file instead of the OS keychain.
        /// Also makes `provider` the configured provider.
        #[arg(long)]
        config_file: bool,
    },
    /// Show where the API key for each provider comes from.
    Status,
    /// Remove a stored API key from the keychain and the config file.
    Clear {
        #[arg(long)]
        provider: Option<Provider>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        host: None,
    }) {
        Command::Serve { port, host } => {
            if let Some(port) = port {
                cfg.server.port = port;
            }
            if let Some(host) = host {
                cfg.server.host = host;
            }
            let model = make_model(&cfg)?;
            tunedetective_lib::serve(&cfg, model, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("[server] Failed to listen for ctrl-c: {}", e);
                }
            })
            .await
            .map_err(anyhow::Error::msg)
            .context("run server")?;
        }
        Command::Recommend { prompt } => {
            let model = make_model(&cfg)?;
            let rec = get_recommendations(model.as_ref(), &prompt).await?;
            print_songs(&rec.songs);
            println!("\n{}", rec.description);
        }
        Command::Analyze { file } => {
            let model = make_model(&cfg)?;
            let upload = read_file(&file).await?;
            let meta =
                analyze_song(model.as_ref(), Some(&upload), cfg.server.max_upload_bytes).await?;
            println!("{} by {}", meta.title, meta.artist);
        }
        Command::Emotion { file } => {
            let model = make_model(&cfg)?;
            let upload = read_file(&file).await?;
            match get_emotion_recommendations(
                model.as_ref(),
                Some(&upload),
                cfg.server.max_upload_bytes,
            )
            .await
            {
                Ok(rec) => {
                    println!("Text: {}", rec.text);
                    println!("Emotion: {}\n", rec.emotion);
                    print_songs(&rec.songs);
                    println!("\n{}", rec.description);
                }
                Err(failure) => {
                    if let Some(text) = failure.text.filter(|t| !t.is_empty()) {
                        println!("Text: {}", text);
                    }
                    return Err(failure.error.into());
                }
            }
        }
        Command::Auth { cmd } => match cmd {
            AuthCommand::Set {
                key,
                provider,
                config_file,
            } => {
                let provider = provider.unwrap_or(cfg.model.provider);
                if config_file {
                    CredentialManager::validate_api_key(provider, &key)
                        .map_err(anyhow::Error::msg)?;
                    cfg.model.provider = provider;
                    cfg.model.api_key = key.trim().to_string();
                    config::save(&cfg, cli.config.as_deref()).context("save config")?;
                    println!("Stored {} API key in the config file.", provider);
                } else {
                    CredentialManager::store_api_key(provider, key.trim())
                        .map_err(anyhow::Error::msg)
                        .context("store api key")?;
                    println!("Stored {} API key in the OS keychain.", provider);
                }
            }
            AuthCommand::Status => {
                for provider in [Provider::Claude, Provider::Gemini] {
                    println!("{}: {}", provider, key_source(&cfg, provider));
                }
            }
            AuthCommand::Clear { provider } => {
                let provider = provider.unwrap_or(cfg.model.provider);
                CredentialManager::delete_api_key(provider)
                    .map_err(anyhow::Error::msg)
                    .context("delete api key")?;
                if cfg.model.provider == provider && !cfg.model.api_key.is_empty() {
                    cfg.model.api_key.clear();
                    config::save(&cfg, cli.config.as_deref()).context("save config")?;
                    println!("Removed {} API key from the config file.", provider);
                }
                println!("Removed {} API key from the OS keychain.", provider);
            }
        },
    }

    Ok(())
}

fn make_model(cfg: &Config) -> anyhow::Result<Arc<dyn MusicModel>> {
    let Some(key) = config::resolve_api_key(&cfg.model) else {
        bail!(
            "no API key for {}: set model.api_key in the config, export {}, or run `tunedetective auth set <KEY>`",
            cfg.model.provider,
            cfg.model.provider.env_var()
        );
    };
    let model = ai::build_model(&cfg.model, key).context("build model client")?;
    Ok(model)
}

async fn read_file(path: &std::path::Path) -> anyhow::Result<Upload> {
    Upload::from_path(path)
        .await
        .with_context(|| format!("read {}", path.display()))
}

fn key_source(cfg: &Config, provider: Provider) -> &'static str {
    if cfg.model.provider == provider && !cfg.model.api_key.trim().is_empty() {
        "config file"
    } else if std::env::var(provider.env_var()).is_ok_and(|v| !v.trim().is_empty()) {
        provider.env_var()
    } else if CredentialManager::has_api_key(provider).unwrap_or(false) {
        "OS keychain"
    } else {
        "not set"
    }
}

fn print_songs(songs: &[Song]) {
    for (i, song) in songs.iter().enumerate() {
        println!("{:02}. {} by {}", i + 1, song.title, song.artist);
    }
}

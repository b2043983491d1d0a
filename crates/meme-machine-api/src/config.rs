//! Service configuration: TOML file plus environment overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use meme_machine::WrapMode;

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "meme-machine.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemeConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub embedding: EmbeddingConfig,
    pub caption: CaptionConfig,
    pub moderation: ModerationConfig,
    pub compose: ComposeConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_path: String,
    pub tokenizer_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CaptionConfig {
    pub api_base: String,
    pub model: String,
    pub max_words: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModerationConfig {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ComposeConfig {
    pub output_dir: String,
    pub wrap: String,
    pub font_scale: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PublishConfig {
    pub mode: String,
    pub webhook_url: Option<String>,
}

impl Default for MemeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            embedding: EmbeddingConfig::default(),
            caption: CaptionConfig::default(),
            moderation: ModerationConfig::default(),
            compose: ComposeConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "data/meme_data_with_embeddings.json".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: "models/model.onnx".into(),
            tokenizer_path: "models/tokenizer.json".into(),
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.0-flash".into(),
            max_words: 20,
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            output_dir: "images".into(),
            wrap: "word".into(),
            font_scale: 3,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            mode: "disk".into(),
            webhook_url: None,
        }
    }
}

/// Path of the config file: `MEME_MACHINE_CONFIG` if set, otherwise
/// `./meme-machine.toml`.
pub fn default_config_path() -> PathBuf {
    match std::env::var("MEME_MACHINE_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

impl MemeConfig {
    /// Load config from the default location, then apply env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env overrides. A missing file
    /// means defaults; a file that fails to parse is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MEME_MACHINE_ADDR,
    /// MEME_MACHINE_CATALOG, MEME_MACHINE_LOG).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEME_MACHINE_ADDR") {
            self.server.addr = val;
        }
        if let Ok(val) = std::env::var("MEME_MACHINE_CATALOG") {
            self.catalog.path = val;
        }
        if let Ok(val) = std::env::var("MEME_MACHINE_LOG") {
            self.server.log_level = val;
        }
    }

    /// Parse the listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.server.addr))
    }

    /// Resolve the configured wrap strategy.
    pub fn wrap_mode(&self) -> WrapMode {
        parse_wrap_mode(&self.compose.wrap)
    }
}

/// Map a wrap-strategy name ("word" or "single") to a [`WrapMode`].
/// Unknown names fall back to word wrap with a warning.
pub fn parse_wrap_mode(name: &str) -> WrapMode {
    match name {
        "word" => WrapMode::WordWrap,
        "single" => WrapMode::SingleLine,
        other => {
            tracing::warn!(wrap = other, "unknown wrap mode, using word wrap");
            WrapMode::WordWrap
        }
    }
}

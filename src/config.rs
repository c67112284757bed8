use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::DEFAULT_TIMEOUT;

/// Project-local configuration file
pub const CONFIG_PATH: &str = ".pardus/config.toml";

pub const DEFAULT_EMBED_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text:latest";

/// Driver configuration (from .pardus/config.toml, then environment)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine binary; looked up on PATH when unset
    pub binary: Option<PathBuf>,
    /// Database file; in-memory sessions when unset
    pub database: Option<PathBuf>,
    /// Per-command bound in seconds
    pub timeout_secs: u64,
    /// Extra arguments for the engine binary
    pub args: Vec<String>,
    pub embeddings: EmbeddingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub url: String,
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: None,
            database: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            args: Vec::new(),
            embeddings: EmbeddingsConfig::default(),
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBED_URL.to_string(),
            model: DEFAULT_EMBED_MODEL.to_string(),
        }
    }
}

impl Config {
    /// Load `.pardus/config.toml` (falling back to the user config dir), then apply
    /// `PARDUS_*` environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match config_file() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))?;
        config.binary = config.binary.map(|p| expand(&p));
        config.database = config.database.map(|p| expand(&p));
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup("PARDUS_BINARY") {
            self.binary = Some(expand(Path::new(&binary)));
        }
        if let Some(database) = lookup("PARDUS_DATABASE") {
            self.database = Some(expand(Path::new(&database)));
        }
        if let Some(secs) = lookup("PARDUS_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("PARDUS_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(url) = lookup("PARDUS_EMBED_URL") {
            self.embeddings.url = url;
        }
        if let Some(model) = lookup("PARDUS_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_PATH);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("pardus").join("config.toml"))
        .filter(|path| path.exists())
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

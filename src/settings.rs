// Persistent settings: default username/repository, a stored write key and
// the Hub endpoint. Kept as a small JSON file in the user's config dir.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Values supplied by the environment for this run only. Never serialized.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub write_key: Option<String>,
    pub endpoint: Option<String>,
}

/// Stored settings. The public fields are what the settings file holds;
/// `token()` and `endpoint()` are what a run should use.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub write_key: String,
    pub default_username: String,
    pub default_repo: String,
    pub commit_message: String,
    pub endpoint: String,
    pub create_pr: bool,
    pub private: bool,
    #[serde(skip)]
    pub env: EnvOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            write_key: String::new(),
            default_username: String::new(),
            default_repo: "sd-models-backup".into(),
            commit_message: "Backup files".into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            create_pr: false,
            private: true,
            env: EnvOverrides::default(),
        }
    }
}

// Hand-written so the write key never ends up in logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("write_key", &if self.write_key.is_empty() { "" } else { "<redacted>" })
            .field("default_username", &self.default_username)
            .field("default_repo", &self.default_repo)
            .field("commit_message", &self.commit_message)
            .field("endpoint", &self.endpoint)
            .field("create_pr", &self.create_pr)
            .field("private", &self.private)
            .field("env_write_key", &self.env.write_key.is_some())
            .field("env_endpoint", &self.env.endpoint)
            .finish()
    }
}

impl Settings {
    /// `<config dir>/hfbackup/settings.json`, or `./hfbackup/settings.json`
    /// when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hfbackup")
            .join("settings.json")
    }

    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::default_path())?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&data)
            .with_context(|| format!("Parsing settings json at {}", path.display()))?;
        Ok(settings)
    }

    /// `HF_TOKEN` takes over from the stored write key and `HF_ENDPOINT` from
    /// the stored endpoint. Saving still writes the stored values.
    pub fn apply_env(&mut self) {
        self.apply_vars(std::env::var("HF_TOKEN").ok(), std::env::var("HF_ENDPOINT").ok());
    }

    fn apply_vars(&mut self, token: Option<String>, endpoint: Option<String>) {
        self.env = EnvOverrides {
            write_key: token.filter(|t| !t.is_empty()),
            endpoint: endpoint.filter(|e| !e.is_empty()),
        };
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Write key for this run: the environment one if set, else the stored one.
    pub fn token(&self) -> &str {
        self.env.write_key.as_deref().unwrap_or(&self.write_key)
    }

    pub fn has_write_key(&self) -> bool {
        !self.token().is_empty()
    }

    /// Endpoint for this run, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.env
            .endpoint
            .as_deref()
            .unwrap_or(&self.endpoint)
            .trim_end_matches('/')
    }
}

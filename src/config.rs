//! Configuration for stagesync, read from `.stagesync/stagesync.toml`.
//!
//! Settings are layered: file → environment → CLI. Missing keys fall back
//! to defaults, so an empty file (or no file) is a valid configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! [sync]
//! interval_secs = 30
//! title_max_chars = 20
//!
//! [storage]
//! sessions_file = "sessions.json"
//! ```
//!
//! | Environment variable           | Overrides               |
//! |--------------------------------|-------------------------|
//! | `STAGESYNC_SYNC_INTERVAL_SECS` | `sync.interval_secs`    |
//! | `STAGESYNC_SESSIONS_FILE`      | `storage.sessions_file` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::init::get_stagesync_dir;
use crate::reconcile::ReconcileOptions;

/// File name of the configuration inside `.stagesync/`.
pub const CONFIG_FILE: &str = "stagesync.toml";

pub const ENV_SYNC_INTERVAL_SECS: &str = "STAGESYNC_SYNC_INTERVAL_SECS";
pub const ENV_SESSIONS_FILE: &str = "STAGESYNC_SESSIONS_FILE";

/// Periodic sync and flush settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between timer-driven syncs while a view is attached
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Characters of source text kept in a derived session title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_title_max_chars() -> usize {
    crate::reconcile::DEFAULT_TITLE_MAX_CHARS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

/// Where sessions are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Registry file, relative to `.stagesync/` unless absolute
    #[serde(default = "default_sessions_file")]
    pub sessions_file: PathBuf,
}

fn default_sessions_file() -> PathBuf {
    PathBuf::from("sessions.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sessions_file: default_sessions_file(),
        }
    }
}

/// Contents of `stagesync.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagesyncToml {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl StagesyncToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse stagesync.toml")
    }

    /// Load `stagesync.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize stagesync.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, returning a warning per unusable value.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(raw) = lookup(ENV_SYNC_INTERVAL_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.sync.interval_secs = secs,
                Err(_) => warnings.push(format!(
                    "Ignoring {}='{}': expected a whole number of seconds",
                    ENV_SYNC_INTERVAL_SECS, raw
                )),
            }
        }

        if let Some(raw) = lookup(ENV_SESSIONS_FILE) {
            if raw.trim().is_empty() {
                warnings.push(format!("Ignoring empty {}", ENV_SESSIONS_FILE));
            } else {
                self.storage.sessions_file = PathBuf::from(raw);
            }
        }

        warnings
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.sync.interval_secs == 0 {
            warnings.push(format!(
                "sync.interval_secs is 0: the timer falls back to {}s",
                default_interval_secs()
            ));
        }
        if self.sync.title_max_chars == 0 {
            warnings.push(
                "sync.title_max_chars is 0: derived titles will be just \"...\"".to_string(),
            );
        }
        if self.storage.sessions_file.as_os_str().is_empty() {
            warnings.push("storage.sessions_file is empty".to_string());
        }

        warnings
    }
}

/// Effective configuration: `stagesync.toml`, then environment, then CLI.
#[derive(Debug, Clone)]
pub struct StagesyncConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .stagesync directory
    pub stagesync_dir: PathBuf,
    /// File settings with environment overrides applied
    pub toml: StagesyncToml,
    /// CLI override: verbose logging
    pub verbose: bool,
    /// CLI override for the sessions file
    pub cli_sessions_file: Option<PathBuf>,
    /// Problems found while reading environment overrides
    env_warnings: Vec<String>,
}

impl StagesyncConfig {
    /// Load configuration for `project_dir`.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let stagesync_dir = get_stagesync_dir(&project_dir);
        let mut toml = StagesyncToml::load_or_default(&stagesync_dir)?;
        let env_warnings = toml.apply_env_overrides();

        Ok(Self {
            project_dir,
            stagesync_dir,
            toml,
            verbose: false,
            cli_sessions_file: None,
            env_warnings,
        })
    }

    /// Load configuration with CLI overrides.
    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        sessions_file: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_sessions_file = sessions_file;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.stagesync_dir.join(CONFIG_FILE)
    }

    /// Path of the session registry (CLI → env → file → default).
    pub fn sessions_file(&self) -> PathBuf {
        let file = self
            .cli_sessions_file
            .as_ref()
            .unwrap_or(&self.toml.storage.sessions_file);
        self.stagesync_dir.join(file)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.toml.sync.interval_secs)
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            title_max_chars: self.toml.sync.title_max_chars,
        }
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.env_warnings.clone();
        warnings.extend(self.toml.validate());
        warnings
    }
}

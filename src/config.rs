//! # Configuration Module
//!
//! Data directory layout and engine settings for Tempo.
//!
//! ## Data Storage
//!
//! Tempo keeps its files in the platform-standard data directory:
//! - Linux: `~/.local/share/tempo/`
//! - macOS: `~/Library/Application Support/tempo/`
//! - Windows: `%APPDATA%\tempo\`
//!
//! Inside it, `tempo.db` holds saved playlists and `config.json` holds the
//! escalation settings. A missing `config.json` means defaults; missing keys
//! in it fall back to their defaults one by one.
//!
//! ```json
//! { "tolerance_step": 15, "max_tolerance": 600 }
//! ```

use crate::algorithm::DEFAULT_EXACT_SEARCH_LIMIT;
use crate::playlist::EscalationPolicy;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the Tempo data directory, creating it if needed.
///
/// # Errors
///
/// Fails if the platform has no data directory or it cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let tempo_dir = data_dir.join("tempo");
    fs::create_dir_all(&tempo_dir).with_context(|| {
        format!(
            "Failed to create Tempo data directory at {}. Please check file permissions.",
            tempo_dir.display()
        )
    })?;

    Ok(tempo_dir)
}

/// Returns the path of the playlist database.
///
/// ```no_run
/// let db_path = tempo::config::get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("tempo.db"))
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// Escalation and search settings, as stored in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tolerance of the first attempt, in seconds.
    pub initial_tolerance: u64,
    /// Seconds added to the tolerance after each miss.
    pub tolerance_step: u64,
    pub max_tolerance: u64,
    pub max_attempts: usize,
    /// Largest pool the exhaustive search will take on.
    pub exact_search_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let policy = EscalationPolicy::default();
        Self {
            initial_tolerance: policy.initial_tolerance,
            tolerance_step: policy.step,
            max_tolerance: policy.max_tolerance,
            max_attempts: policy.max_attempts,
            exact_search_limit: DEFAULT_EXACT_SEARCH_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.escalation_policy().validate()?;
        if self.exact_search_limit == 0 {
            anyhow::bail!("exact_search_limit must be at least 1");
        }
        Ok(())
    }

    #[must_use]
    pub fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy {
            initial_tolerance: self.initial_tolerance,
            step: self.tolerance_step,
            max_tolerance: self.max_tolerance,
            max_attempts: self.max_attempts,
        }
    }
}

/// Where this run reads and writes its files.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl RuntimeConfig {
    /// Use explicit paths where given, the data directory otherwise.
    pub fn resolve(db_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let config_path = match config_path {
            Some(path) => path,
            None => get_config_path()?,
        };
        Ok(Self { db_path, config_path })
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        EngineConfig::load(&self.config_path)
    }
}

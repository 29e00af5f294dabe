//! Configuration loading and root folder resolution
//!
//! Two tiers:
//! 1. **TOML bootstrap**: database location, port, reviewer id, logging and
//!    the progression rules (rank table, rewards, final-lesson marker).
//!    Read once at startup; the process must restart to pick up changes.
//! 2. **Root folder resolution** in priority order:
//!    command-line argument, environment variable, TOML `root_folder`,
//!    OS-dependent compiled default.
//!
//! A missing TOML file is not fatal: a warning is logged and the built-in
//! defaults are used. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FRETWORK_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "fretwork.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Data folder holding the database (optional, see [`resolve_root_folder`])
    pub root_folder: Option<PathBuf>,

    /// Explicit database file path; defaults to `<root>/fretwork.db`
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    pub port: u16,

    /// Chat id of the single reviewer. 0 disables reviewer checks.
    pub reviewer_id: i64,

    pub logging: LoggingConfig,

    pub progression: ProgressionConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            port: default_port(),
            reviewer_id: 0,
            logging: LoggingConfig::default(),
            progression: ProgressionConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One row of the rank table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTier {
    /// Minimum reputation for this rank
    pub threshold: u32,
    /// Display label
    pub label: String,
}

impl RankTier {
    pub fn new(threshold: u32, label: impl Into<String>) -> Self {
        Self {
            threshold,
            label: label.into(),
        }
    }
}

/// Progression rules injected into the review engine
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Reputation granted for an ordinary lesson
    pub lesson_reward: u32,
    /// Reputation granted for any song breakdown
    pub song_reward: u32,
    /// Reputation granted for a lesson whose title carries the final marker
    pub final_lesson_reward: u32,
    /// Case-insensitive substring marking graduation lessons
    pub final_lesson_marker: String,
    /// Rank table, any order; must contain threshold 0
    pub ranks: Vec<RankTier>,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            lesson_reward: 10,
            song_reward: 20,
            final_lesson_reward: 30,
            final_lesson_marker: "graduation".to_string(),
            ranks: vec![
                RankTier::new(0, "Novice"),
                RankTier::new(50, "Apprentice"),
                RankTier::new(150, "Guitar Adept"),
                RankTier::new(300, "Chord Master"),
                RankTier::new(500, "Percussion Master"),
                RankTier::new(750, "Beatmaker"),
                RankTier::new(1000, "Fretboard Legend"),
                RankTier::new(1500, "Fingerstyle Guru"),
            ],
        }
    }
}

impl ProgressionConfig {
    /// Check the invariants the rank evaluator and reward calculation rely on
    pub fn validate(&self) -> Result<()> {
        if self.final_lesson_marker.trim().is_empty() {
            return Err(Error::Config(
                "progression.final_lesson_marker must not be empty".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for tier in &self.ranks {
            if tier.label.trim().is_empty() {
                return Err(Error::Config(format!(
                    "rank at threshold {} has an empty label",
                    tier.threshold
                )));
            }
            if !seen.insert(tier.threshold) {
                return Err(Error::Config(format!(
                    "duplicate rank threshold {}",
                    tier.threshold
                )));
            }
        }

        if !seen.contains(&0) {
            return Err(Error::Config(
                "rank table must contain a threshold of 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_port() -> u16 {
    5790
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load bootstrap configuration
    ///
    /// With `path = None` the platform config file is tried
    /// (`<config dir>/fretwork/config.toml`). A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_file() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.progression.validate()?;
        Ok(config)
    }

    /// Database file for a resolved root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
    }
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config `root_folder`
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Platform config file location
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fretwork").join("config.toml"))
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/fretwork (or /var/lib/fretwork for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("fretwork"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fretwork"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("fretwork"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fretwork"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("fretwork"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fretwork"))
    } else {
        PathBuf::from("./fretwork_data")
    }
}

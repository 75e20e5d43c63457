//! Configuration module for genmedia.

use serde::Deserialize;
use std::path::Path;

use crate::media::effective_max_upload;
use crate::{MediaError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "db/genmedia.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Media storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Data directory holding the media directory of every tree.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Ceiling on a whole upload request (e.g. "8M").
    #[serde(default = "default_post_max_size")]
    pub post_max_size: String,
    /// Ceiling on a single uploaded file (e.g. "2M").
    #[serde(default = "default_upload_max_filesize")]
    pub upload_max_filesize: String,
}

fn default_data_path() -> String {
    "data".to_string()
}

fn default_post_max_size() -> String {
    "8M".to_string()
}

fn default_upload_max_filesize() -> String {
    "2M".to_string()
}

impl MediaConfig {
    /// Largest file a user may upload, in bytes.
    ///
    /// Both ceilings apply, so the smaller one wins.
    pub fn max_upload_bytes(&self) -> u64 {
        effective_max_upload([
            self.post_max_size.as_str(),
            self.upload_max_filesize.as_str(),
        ])
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            post_max_size: default_post_max_size(),
            upload_max_filesize: default_upload_max_filesize(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/genmedia.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Media storage configuration.
    #[serde(default)]
    pub media: MediaConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MediaError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MediaError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GENMEDIA_DATA_PATH`: Override the media data directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(data_path) = std::env::var("GENMEDIA_DATA_PATH") {
            if !data_path.is_empty() {
                self.media.data_path = data_path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The media data path is empty
    /// - The upload ceilings leave no room for any upload
    pub fn validate(&self) -> Result<()> {
        if self.media.data_path.trim().is_empty() {
            return Err(MediaError::Config("media.data_path must not be empty".to_string()));
        }
        if self.media.max_upload_bytes() == 0 {
            return Err(MediaError::Config(format!(
                "upload limit is zero (post_max_size = {:?}, upload_max_filesize = {:?})",
                self.media.post_max_size, self.media.upload_max_filesize
            )));
        }
        Ok(())
    }
}

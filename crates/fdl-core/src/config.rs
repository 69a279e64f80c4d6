//! Downloader configuration.
//!
//! Values come from `FDL_*` environment variables (the binaries load a
//! `.env` file first) and are then overridden by command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default size cap: 10 GiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Default read/write chunk: 32 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Largest accepted chunk size.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Suffix appended to the destination while bytes are still arriving.
pub const DEFAULT_PARTIAL_SUFFIX: &str = ".part";

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("fdl/", env!("CARGO_PKG_VERSION"));

/// Environment variable names.
pub mod env_keys {
    pub const MAX_FILE_SIZE: &str = "FDL_MAX_FILE_SIZE";
    pub const CHUNK_SIZE: &str = "FDL_CHUNK_SIZE";
    pub const PROBE_TIMEOUT_SECS: &str = "FDL_PROBE_TIMEOUT_SECS";
    pub const CONNECT_TIMEOUT_SECS: &str = "FDL_CONNECT_TIMEOUT_SECS";
    pub const SPEED_WINDOW_SECS: &str = "FDL_SPEED_WINDOW_SECS";
    pub const PARTIAL_SUFFIX: &str = "FDL_PARTIAL_SUFFIX";
    pub const REJECT_HTML: &str = "FDL_REJECT_HTML";
    pub const USER_AGENT: &str = "FDL_USER_AGENT";
    pub const YTDLP_PATH: &str = "FDL_YTDLP_PATH";
    pub const FFMPEG_PATH: &str = "FDL_FFMPEG_PATH";
}

/// Runtime configuration shared by every download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Resources larger than this fail with `FileTooLarge`.
    pub max_file_size: u64,
    /// Bytes per read/write step; progress is emitted once per chunk.
    pub chunk_size: usize,
    /// Timeout of the validation and metadata probes.
    pub probe_timeout: Duration,
    /// TCP connect timeout for the transfer request.
    pub connect_timeout: Duration,
    /// Sliding window used for speed estimates.
    pub speed_window: Duration,
    /// Suffix of the partial file.
    pub partial_suffix: String,
    /// Reject `text/html` responses as web pages.
    pub reject_html: bool,
    pub user_agent: String,
    /// Explicit `yt-dlp` binary; searched on `PATH` when unset.
    pub ytdlp_path: Option<PathBuf>,
    /// Explicit `ffmpeg` binary; searched on `PATH` when unset.
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            probe_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(15),
            speed_window: Duration::from_secs(3),
            partial_suffix: DEFAULT_PARTIAL_SUFFIX.to_string(),
            reject_html: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ytdlp_path: None,
            ffmpeg_path: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Chunk size must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE} bytes, got {0}")]
    InvalidChunkSize(usize),

    #[error("Maximum file size must be greater than zero")]
    ZeroMaxFileSize,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Partial file suffix cannot be empty")]
    EmptyPartialSuffix,
}

impl DownloaderConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unset or empty keys keep their defaults. The result is validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = get(env_keys::MAX_FILE_SIZE) {
            config.max_file_size = parse_value(env_keys::MAX_FILE_SIZE, &v)?;
        }
        if let Some(v) = get(env_keys::CHUNK_SIZE) {
            config.chunk_size = parse_value(env_keys::CHUNK_SIZE, &v)?;
        }
        if let Some(v) = get(env_keys::PROBE_TIMEOUT_SECS) {
            config.probe_timeout = Duration::from_secs(parse_value(env_keys::PROBE_TIMEOUT_SECS, &v)?);
        }
        if let Some(v) = get(env_keys::CONNECT_TIMEOUT_SECS) {
            config.connect_timeout =
                Duration::from_secs(parse_value(env_keys::CONNECT_TIMEOUT_SECS, &v)?);
        }
        if let Some(v) = get(env_keys::SPEED_WINDOW_SECS) {
            config.speed_window = Duration::from_secs(parse_value(env_keys::SPEED_WINDOW_SECS, &v)?);
        }
        if let Some(v) = get(env_keys::PARTIAL_SUFFIX) {
            config.partial_suffix = v;
        }
        if let Some(v) = get(env_keys::REJECT_HTML) {
            config.reject_html = parse_bool(env_keys::REJECT_HTML, &v)?;
        }
        if let Some(v) = get(env_keys::USER_AGENT) {
            config.user_agent = v;
        }
        if let Some(v) = get(env_keys::YTDLP_PATH) {
            config.ytdlp_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(env_keys::FFMPEG_PATH) {
            config.ffmpeg_path = Some(PathBuf::from(v));
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the size cap.
    #[must_use]
    pub const fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Override the chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check value bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::ZeroMaxFileSize);
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("Probe timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("Connect timeout"));
        }
        if self.speed_window.is_zero() {
            return Err(ConfigError::ZeroDuration("Speed window"));
        }
        if self.partial_suffix.is_empty() {
            return Err(ConfigError::EmptyPartialSuffix);
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.max_file_size, 10_737_418_240);
        assert_eq!(config.chunk_size, 32_768);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.speed_window, Duration::from_secs(3));
        assert_eq!(config.partial_suffix, ".part");
        assert!(config.reject_html);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_lookup_is_default() {
        let config = DownloaderConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DownloaderConfig::default());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = DownloaderConfig::from_lookup(lookup(&[
            ("FDL_MAX_FILE_SIZE", "1000"),
            ("FDL_CHUNK_SIZE", "4096"),
            ("FDL_PROBE_TIMEOUT_SECS", "2"),
            ("FDL_REJECT_HTML", "no"),
            ("FDL_YTDLP_PATH", "/opt/yt-dlp"),
        ]))
        .unwrap();

        assert_eq!(config.max_file_size, 1000);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.probe_timeout, Duration::from_secs(2));
        assert!(!config.reject_html);
        assert_eq!(config.ytdlp_path, Some(PathBuf::from("/opt/yt-dlp")));
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = DownloaderConfig::from_lookup(lookup(&[("FDL_CHUNK_SIZE", "  ")])).unwrap();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_unparsable_value() {
        let err = DownloaderConfig::from_lookup(lookup(&[("FDL_MAX_FILE_SIZE", "ten")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "FDL_MAX_FILE_SIZE",
                ..
            }
        ));
    }

    #[test]
    fn test_chunk_size_bounds() {
        let config = DownloaderConfig::default().with_chunk_size(512);
        assert_eq!(config.validate(), Err(ConfigError::InvalidChunkSize(512)));

        let config = DownloaderConfig::default().with_chunk_size(2 * 1024 * 1024);
        assert!(config.validate().is_err());

        let config = DownloaderConfig::default().with_chunk_size(MAX_CHUNK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = DownloaderConfig::default().with_max_file_size(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxFileSize));

        let err = DownloaderConfig::from_lookup(lookup(&[("FDL_PROBE_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroDuration("Probe timeout"));
    }
}

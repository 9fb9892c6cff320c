//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl ApiConfig {
    /// Base URL without a trailing slash
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Where the session (tokens + cached profile) is persisted
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_file")]
    pub file: String,
}

fn default_session_file() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("intellireport")
                .join("session.json")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./intellireport_session.json".to_string())
}

impl SessionConfig {
    /// Session file path with a leading `~` expanded to the home directory
    pub fn path(&self) -> PathBuf {
        expand_home(&self.file, dirs::home_dir())
    }
}

fn expand_home(file: &str, home: Option<PathBuf>) -> PathBuf {
    let rest = if file == "~" {
        Some("")
    } else {
        file.strip_prefix("~/")
    };

    match (rest, home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(file),
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_session_file(),
        }
    }
}

/// Client-side upload limits
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("intellireport").join("config.toml")),
            Some(PathBuf::from("/etc/intellireport/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("INTELLIREPORT_API_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = lookup("INTELLIREPORT_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.api.request_timeout_secs = t;
            }
        }

        if let Some(file) = lookup("INTELLIREPORT_SESSION_FILE") {
            self.session.file = file;
        }

        if let Some(max) = lookup("INTELLIREPORT_MAX_UPLOAD_BYTES") {
            if let Ok(m) = max.parse() {
                self.upload.max_size_bytes = m;
            }
        }

        if let Some(level) = lookup("INTELLIREPORT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("INTELLIREPORT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# IntelliReport Configuration
#
# Environment variables override these settings:
# - INTELLIREPORT_API_URL
# - INTELLIREPORT_TIMEOUT_SECS
# - INTELLIREPORT_SESSION_FILE
# - INTELLIREPORT_MAX_UPLOAD_BYTES
# - INTELLIREPORT_LOG_LEVEL
# - INTELLIREPORT_LOG_FORMAT

[api]
# Base URL of the IntelliReport REST API
base_url = "http://localhost:8000/api"

# Request timeout in seconds
request_timeout_secs = 30

[session]
# File holding the access token, refresh token and cached user profile.
# Defaults to the platform data directory; `~` expands to the home directory.
# file = "~/.local/share/intellireport/session.json"

[upload]
# Largest CSV accepted for upload (bytes)
max_size_bytes = 10485760

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for log collectors)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.upload.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.upload.max_size_bytes, 10485760);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_generated_config_session_path_is_absolute() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.session.file, default_session_file());
        if dirs::data_local_dir().is_some() {
            assert!(config.session.path().is_absolute());
        }
    }

    #[test]
    fn test_session_path_expands_home() {
        let home = Some(PathBuf::from("/home/ana"));
        assert_eq!(
            expand_home("~/.local/share/intellireport/session.json", home.clone()),
            PathBuf::from("/home/ana/.local/share/intellireport/session.json")
        );
        assert_eq!(expand_home("~", home.clone()), PathBuf::from("/home/ana"));
        assert_eq!(
            expand_home("/var/lib/session.json", home.clone()),
            PathBuf::from("/var/lib/session.json")
        );
        assert_eq!(expand_home("~bob/session.json", home), PathBuf::from("~bob/session.json"));
        assert_eq!(expand_home("~/s.json", None), PathBuf::from("~/s.json"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[api]\nbase_url = \"https://reports.example.com/api/\"\n").unwrap();
        assert_eq!(config.api.normalized_base_url(), "https://reports.example.com/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.upload.max_size_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INTELLIREPORT_API_URL", "http://api.test"),
            ("INTELLIREPORT_TIMEOUT_SECS", "5"),
            ("INTELLIREPORT_MAX_UPLOAD_BYTES", "not-a-number"),
            ("INTELLIREPORT_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://api.test");
        assert_eq!(config.api.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.upload.max_size_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/intellireport.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

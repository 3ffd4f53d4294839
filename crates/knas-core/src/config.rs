//! Configuration management for Knas.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/knas/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
/// The defaults reproduce the observed deployment: 5 workers, a 60 s
/// per-check ceiling, 15 s/45 s portal step timeouts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scan orchestration settings
    pub scanning: ScanningConfig,
    /// Portal protocol settings
    pub portal: PortalConfig,
    /// Scan log sink settings
    pub log_sink: LogSinkConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `KNAS_MAX_CONCURRENT_SCANS`: Override the worker pool size
    /// - `KNAS_PORTAL_BASE_URL`: Override the portal base URL
    /// - `KNAS_LOG_BACKEND`: Override the sink backend (`sqlite`/`supabase`)
    /// - `KNAS_SUPABASE_URL`: Override the hosted backend project URL
    /// - `KNAS_SUPABASE_SERVICE_KEY`: Override the hosted backend key
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        // Override from environment
        if let Ok(val) = std::env::var("KNAS_MAX_CONCURRENT_SCANS") {
            if let Ok(max) = val.parse() {
                config.scanning.max_concurrent_scans = max;
                tracing::debug!("Override max_concurrent_scans from env: {}", max);
            }
        }

        if let Ok(val) = std::env::var("KNAS_PORTAL_BASE_URL") {
            config.portal.base_url = val;
        }

        if let Ok(val) = std::env::var("KNAS_LOG_BACKEND") {
            match val.as_str() {
                "sqlite" => config.log_sink.backend = LogSinkBackend::Sqlite,
                "supabase" => config.log_sink.backend = LogSinkBackend::Supabase,
                other => tracing::warn!("Unknown KNAS_LOG_BACKEND value: {}", other),
            }
        }

        if let Ok(val) = std::env::var("KNAS_SUPABASE_URL") {
            config.log_sink.supabase_url = val;
        }

        if let Ok(val) = std::env::var("KNAS_SUPABASE_SERVICE_KEY") {
            config.log_sink.supabase_service_key = val;
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/knas/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("il", "knas", "knas").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path (SQLite log database lives here).
    ///
    /// Uses XDG base directories: `~/.local/share/knas`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("il", "knas", "knas").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Scan orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Number of municipality checks allowed to run concurrently
    pub max_concurrent_scans: usize,
    /// Ceiling timeout for one municipality check, in seconds.
    /// Independent of the per-step portal timeouts.
    pub check_timeout_secs: u64,
}

impl ScanningConfig {
    /// Per-check ceiling as a `Duration`.
    #[must_use]
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: 5,
            check_timeout_secs: 60,
        }
    }
}

/// Portal protocol settings.
///
/// The short timeout covers the bootstrap/negotiation/intermediate
/// steps; the long timeout covers search and detail, which the legacy
/// backend is known to serve slowly for some tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the shared portal system
    pub base_url: String,
    /// Timeout for the session-establishment steps, in seconds
    pub short_timeout_secs: u64,
    /// Timeout for the search and detail steps, in seconds
    pub long_timeout_secs: u64,
    /// User-Agent header sent on every portal request
    pub user_agent: String,
    /// Accept-Language header sent on every portal request
    pub accept_language: String,
}

impl PortalConfig {
    /// Short step timeout as a `Duration`.
    #[must_use]
    pub fn short_timeout(&self) -> Duration {
        Duration::from_secs(self.short_timeout_secs)
    }

    /// Long step timeout as a `Duration`.
    #[must_use]
    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.doh.co.il".to_string(),
            short_timeout_secs: 15,
            long_timeout_secs: 45,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "he,en;q=0.9".to_string(),
        }
    }
}

/// Which scan log backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSinkBackend {
    /// Embedded SQLite database
    Sqlite,
    /// Hosted Supabase (PostgREST) backend
    Supabase,
}

/// Scan log sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Backend selector
    pub backend: LogSinkBackend,
    /// Path to the SQLite database file (SQLite backend only)
    pub sqlite_path: String,
    /// Supabase project URL (hosted backend only)
    pub supabase_url: String,
    /// Supabase service-role key (hosted backend only)
    pub supabase_service_key: String,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            backend: LogSinkBackend::Sqlite,
            sqlite_path: "scan_logs.db".to_string(),
            supabase_url: String::new(),
            supabase_service_key: String::new(),
        }
    }
}

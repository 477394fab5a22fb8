//! Bootstrap configuration loading and backend URL resolution
//!
//! Everything the scanner needs before it can talk to the catalog service.
//! Sources, highest priority first:
//!
//! 1. Command-line arguments
//! 2. Environment variables (`NUTRISCAN_BACKEND_URL`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are
//! used. A missing backend URL is fatal.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable consulted for the catalog service base address
pub const BACKEND_URL_ENV: &str = "NUTRISCAN_BACKEND_URL";

/// Default delay before a terminal result returns to scanning
pub const DEFAULT_RESET_DELAY_MS: u64 = 5000;

/// Default timeout for a single catalog request
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Catalog service base address (e.g. `http://192.168.1.20:8000`)
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Scan flow timing
    #[serde(default)]
    pub scanner: ScannerSettings,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scan flow timing settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerSettings {
    /// Delay before a shown result automatically returns to scanning
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,

    /// Timeout applied to each catalog request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_reset_delay_ms() -> u64 {
    DEFAULT_RESET_DELAY_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            reset_delay_ms: DEFAULT_RESET_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl ScannerSettings {
    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    ///
    /// Unlike [`TomlConfig::load_or_default`], a missing or malformed file is
    /// an error here.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with graceful degradation
    ///
    /// Uses `path` when given, otherwise the platform default location.
    /// A missing file yields defaults with a warning; a file that exists but
    /// does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config = Self::load(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Platform config file location: `<config_dir>/nutriscan/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nutriscan").join("config.toml"))
}

/// Resolve the catalog service base address
///
/// Priority: CLI argument, then the environment variable named
/// `env_var_name`, then the TOML `backend_url` key. Blank values at any level
/// are skipped. The winning value is normalized with [`normalize_base_url`].
pub fn resolve_backend_url(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> Result<String> {
    let non_blank = |s: &str| !s.trim().is_empty();

    if let Some(url) = cli_arg.filter(|s| non_blank(s)) {
        return Ok(normalize_base_url(url));
    }

    if let Ok(url) = std::env::var(env_var_name) {
        if non_blank(&url) {
            return Ok(normalize_base_url(&url));
        }
    }

    if let Some(url) = toml_config.backend_url.as_deref().filter(|s| non_blank(s)) {
        return Ok(normalize_base_url(url));
    }

    Err(Error::Config("Backend URL is missing".to_string()))
}

/// Normalize a user-supplied base URL
///
/// Adds `http://` when no scheme is present and strips trailing slashes so
/// that path joins never produce `//`.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let normalized = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    if normalized != raw {
        tracing::debug!(original = %raw, normalized = %normalized, "Normalized backend URL");
    }
    normalized
}

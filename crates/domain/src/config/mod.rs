mod channel;
mod rest;

pub use channel::*;
pub use rest::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "COMBINER_CONFIG";
/// Overrides `base_url` from the file.
pub const BASE_URL_ENV: &str = "COMBINER_BASE_URL";
/// Overrides `module_id` from the file.
pub const MODULE_ID_ENV: &str = "COMBINER_MODULE_ID";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinerConfig {
    /// HTTP(S) address of the Combiner Service.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Opaque identifier of the calling module.  Required.
    #[serde(default)]
    pub module_id: String,
    #[serde(default = "d_panel")]
    pub panel: String,
    /// Serve data-returning calls from the bundled fixture set.
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub rest: RestConfig,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            module_id: String::new(),
            panel: d_panel(),
            test_mode: false,
            channel: ChannelConfig::default(),
            rest: RestConfig::default(),
        }
    }
}

fn d_base_url() -> String {
    "http://localhost:22003".into()
}
fn d_panel() -> String {
    "unknown".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loading
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl CombinerConfig {
    /// Default config scoped to `module_id`.
    pub fn for_module(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Load from `$COMBINER_CONFIG` (or `combiner.toml`), falling back to
    /// defaults when the file does not exist, then apply env overrides.
    pub fn load_or_default() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "combiner.toml".into());
        let mut cfg = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            tracing::debug!(path = %path, "config file not found, using defaults");
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply `COMBINER_BASE_URL` / `COMBINER_MODULE_ID` when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(id) = std::env::var(MODULE_ID_ENV) {
            if !id.is_empty() {
                self.module_id = id;
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl CombinerConfig {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.module_id.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "module_id".into(),
                message: "module_id is required".into(),
            });
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "base_url".into(),
                message: format!("expected an http(s) URL, got {:?}", self.base_url),
            });
        }

        if !self.channel.path.starts_with('/') {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.path".into(),
                message: "path must start with '/'".into(),
            });
        }

        if self.channel.reconnect_backoff_ms > self.channel.max_reconnect_backoff_ms {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.reconnect_backoff_ms".into(),
                message: "initial back-off exceeds max_reconnect_backoff_ms".into(),
            });
        }

        if self.channel.max_reconnect_attempts == Some(0) && self.channel.auto_reconnect {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.max_reconnect_attempts".into(),
                message: "auto_reconnect is enabled but 0 attempts are allowed".into(),
            });
        }

        errors
    }

    /// Collapse [`validate`](Self::validate) into a `Result`, failing on
    /// the first error-severity issue.
    pub fn ensure_valid(&self) -> Result<()> {
        for issue in self.validate() {
            match issue.severity {
                ConfigSeverity::Error => return Err(Error::Config(issue.to_string())),
                ConfigSeverity::Warning => tracing::warn!(issue = %issue, "config warning"),
            }
        }
        Ok(())
    }
}

//! # Configuration
//!
//! Optional TOML configuration, `lineage.toml` in the working directory
//! unless `--config` names another file.
//!
//! ```toml
//! [logging]
//! format = "text"        # or "json"
//! filter = "lineage=debug"
//!
//! [tree]
//! files_dir = "files"
//! ```
//!
//! Precedence for every setting: CLI flag, then environment
//! (`LINEAGE_LOG_FORMAT`, `RUST_LOG`), then this file, then defaults.

use lineage_core::LineageError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "lineage.toml";

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "LINEAGE_LOG_FORMAT";

/// Filter used when neither `RUST_LOG` nor the config file sets one.
pub const DEFAULT_LOG_FILTER: &str = "lineage=info,lineage_core=info";

/// Filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "lineage=debug,lineage_core=debug";

/// Upper bound on config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse an environment value. Unknown values fall back to text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: Option<LogFormat>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Attachment directory name, relative to the tree directory.
    pub files_dir: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            files_dir: "files".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub tree: TreeConfig,
}

impl Config {
    /// Parse configuration text.
    pub fn from_toml(text: &str) -> Result<Self, LineageError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| LineageError::InvalidArgument(format!("Invalid config: {}", e)))?;
        if config.tree.files_dir.is_empty()
            || Path::new(&config.tree.files_dir).is_absolute()
            || config.tree.files_dir.split(['/', '\\']).any(|part| part == "..")
        {
            return Err(LineageError::InvalidArgument(format!(
                "Invalid config: files_dir '{}' must be a relative path inside the tree directory",
                config.tree.files_dir
            )));
        }
        Ok(config)
    }

    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, `lineage.toml` in the
    /// working directory is read if present, else defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, LineageError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let metadata = std::fs::metadata(&path).map_err(|e| {
            LineageError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(LineageError::InvalidArgument(format!(
                "Config file {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(&path).map_err(|e| {
            LineageError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Log format after applying the environment override.
    #[must_use]
    pub fn log_format(&self, env_value: Option<&str>) -> LogFormat {
        match env_value {
            Some(value) => LogFormat::from_env_value(value),
            None => self.logging.format.unwrap_or_default(),
        }
    }

    /// Log filter directive: `--verbose`, then `RUST_LOG`, then config.
    #[must_use]
    pub fn log_filter(&self, verbose: bool, env_value: Option<&str>) -> String {
        if verbose {
            return VERBOSE_LOG_FILTER.to_string();
        }
        env_value
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| self.logging.filter.clone())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}

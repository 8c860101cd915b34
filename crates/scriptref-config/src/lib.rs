//! Scriptref Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.scriptref/config.toml`
//! - Local config: `.scriptref/config.toml` (in workspace)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Scope names accepted by `store.default_scope`.
pub const SCOPES: [&str; 4] = ["all", "nt", "ot", "generic"];

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration for scriptref.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptrefConfig {
    /// Data locations
    pub data: DataConfig,

    /// Annotation ingestion settings
    pub ingest: IngestConfig,

    /// Cross-reference store settings
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where collections and the book table live.
///
/// # Example TOML
///
/// ```toml
/// [data]
/// data_dir = "data"
/// book_table = "bible_books.json"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `references_*.json` (relative to the workspace)
    pub data_dir: PathBuf,

    /// Book metadata table (relative to `data_dir`); the bundled table is
    /// used when the file is absent
    pub book_table: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            book_table: PathBuf::from("bible_books.json"),
        }
    }
}

/// Annotation ingestion settings.
///
/// # Example TOML
///
/// ```toml
/// [ingest]
/// default_book = "MRK"
/// header_label = "MARC"
///
/// [ingest.verse_counts]
/// 1 = 45
/// 2 = 28
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Book the annotations belong to
    pub default_book: String,

    /// Chapter header label, e.g. "MARC"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_label: Option<String>,

    /// Chapter number → last verse. Empty means the built-in Mark table.
    pub verse_counts: BTreeMap<String, u32>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_book: "MRK".to_string(),
            header_label: None,
            verse_counts: BTreeMap::new(),
        }
    }
}

impl IngestConfig {
    /// Verse counts keyed by numeric chapter.
    pub fn verse_count_table(&self) -> Result<BTreeMap<u32, u32>, ConfigError> {
        self.verse_counts
            .iter()
            .map(|(chapter, &count)| {
                let number = chapter
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| {
                        ConfigError::invalid_value(
                            format!("ingest.verse_counts.{chapter}"),
                            "chapter must be a positive integer",
                        )
                    })?;
                if count == 0 {
                    return Err(ConfigError::invalid_value(
                        format!("ingest.verse_counts.{chapter}"),
                        "verse count must be greater than zero",
                    ));
                }
                Ok((number, count))
            })
            .collect()
    }
}

/// Cross-reference store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Collections loaded by default (all, nt, ot, generic)
    pub default_scope: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_scope: "all".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::invalid_value(
                "logging.format",
                format!("unknown format '{}'. Valid options: text, json", s),
            )),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override data directory
    pub data_dir: Option<PathBuf>,

    /// Override book table path
    pub book_table: Option<PathBuf>,

    /// Override ingestion book
    pub default_book: Option<String>,

    /// Override default store scope
    pub default_scope: Option<String>,

    /// Override log level
    pub log_level: Option<String>,
}

impl ScriptrefConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.data_dir {
            self.data.data_dir = dir.clone();
        }

        if let Some(ref table) = overrides.book_table {
            self.data.book_table = table.clone();
        }

        if let Some(ref book) = overrides.default_book {
            self.ingest.default_book = book.clone();
        }

        if let Some(ref scope) = overrides.default_scope {
            self.store.default_scope = scope.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.default_book.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "ingest.default_book",
                "must not be empty",
            ));
        }
        self.ingest.verse_count_table()?;

        if !SCOPES.contains(&self.store.default_scope.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "store.default_scope",
                format!(
                    "unknown scope '{}'. Valid options: {}",
                    self.store.default_scope,
                    SCOPES.join(", ")
                ),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid options: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// Get the effective data directory for a workspace.
    pub fn data_dir(&self, workspace_root: &Path) -> PathBuf {
        if self.data.data_dir.is_absolute() {
            self.data.data_dir.clone()
        } else {
            workspace_root.join(&self.data.data_dir)
        }
    }

    /// Get the book table path for a workspace.
    pub fn book_table_path(&self, workspace_root: &Path) -> PathBuf {
        if self.data.book_table.is_absolute() {
            self.data.book_table.clone()
        } else {
            self.data_dir(workspace_root).join(&self.data.book_table)
        }
    }
}

//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.scriptref/config.toml`
//! 2. Local config: `.scriptref/config.toml` (in workspace), or an explicit
//!    file given on the command line
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConfigOverrides, ScriptrefConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".scriptref";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".scriptref";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.scriptref`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<ScriptrefConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.scriptref`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a workspace.
    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a workspace with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates.
    pub fn load(
        &mut self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ScriptrefConfig, ConfigError> {
        let local = self.load_local(workspace_root)?;
        self.layer(local, overrides)
    }

    /// Load configuration using an explicit file in place of the local one.
    pub fn load_with_file(
        &mut self,
        config_path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ScriptrefConfig, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path.to_path_buf()));
        }
        debug!("Loading config from {:?}", config_path);
        let file = load_config_file(config_path)?;
        self.layer(Some(file), overrides)
    }

    fn layer(
        &mut self,
        local: Option<ScriptrefConfig>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ScriptrefConfig, ConfigError> {
        // Start with default config
        let mut config = ScriptrefConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = local {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<ScriptrefConfig>, ConfigError> {
        // Return cached global config if available
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a workspace.
    pub fn load_local(
        &self,
        workspace_root: &Path,
    ) -> Result<Option<ScriptrefConfig>, ConfigError> {
        let local_path = self.local_config_path(workspace_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the local config file for a workspace.
    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &ScriptrefConfig,
    ) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(workspace_root);
        save_config_file(&local_path, config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.scriptref/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_dir(global_dir)
    }

    /// Initialize local configuration for a workspace.
    ///
    /// Creates `.scriptref/config.toml` with default configuration. An
    /// existing file is left untouched.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&workspace_root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &ScriptrefConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<ScriptrefConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &ScriptrefConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// A field of `overlay` left at its default keeps the `base` value.
fn merge_configs(base: ScriptrefConfig, overlay: ScriptrefConfig) -> ScriptrefConfig {
    ScriptrefConfig {
        data: merge_data(base.data, overlay.data),
        ingest: merge_ingest(base.ingest, overlay.ingest),
        store: merge_store(base.store, overlay.store),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_data(base: crate::DataConfig, overlay: crate::DataConfig) -> crate::DataConfig {
    let defaults = crate::DataConfig::default();
    crate::DataConfig {
        data_dir: if overlay.data_dir != defaults.data_dir {
            overlay.data_dir
        } else {
            base.data_dir
        },
        book_table: if overlay.book_table != defaults.book_table {
            overlay.book_table
        } else {
            base.book_table
        },
    }
}

fn merge_ingest(base: crate::IngestConfig, overlay: crate::IngestConfig) -> crate::IngestConfig {
    let book_changed = overlay.default_book != crate::IngestConfig::default().default_book;
    crate::IngestConfig {
        default_book: if book_changed {
            overlay.default_book
        } else {
            base.default_book
        },
        header_label: overlay.header_label.or(base.header_label),
        // Counts describe one book; a new table replaces the old one whole
        verse_counts: if overlay.verse_counts.is_empty() {
            base.verse_counts
        } else {
            overlay.verse_counts
        },
    }
}

fn merge_store(base: crate::StoreConfig, overlay: crate::StoreConfig) -> crate::StoreConfig {
    crate::StoreConfig {
        default_scope: if overlay.default_scope != "all" {
            overlay.default_scope
        } else {
            base.default_scope
        },
    }
}

fn merge_logging(
    base: crate::LoggingConfig,
    overlay: crate::LoggingConfig,
) -> crate::LoggingConfig {
    crate::LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: if overlay.format != crate::LogFormat::Text {
            overlay.format
        } else {
            base.format
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".scriptref");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_global(global_dir: &Path, content: &str) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, ScriptrefConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [data]
            data_dir = "refs"

            [ingest]
            header_label = "MARC"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.data.data_dir, PathBuf::from("refs"));
        assert_eq!(config.ingest.header_label.as_deref(), Some("MARC"));
        assert_eq!(config.ingest.default_book, "MRK");
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        write_global(
            &global_dir,
            r#"
            [logging]
            level = "debug"

            [store]
            default_scope = "ot"
            "#,
        );

        // Local overrides the scope but not the log level
        create_test_config(
            r#"
            [store]
            default_scope = "nt"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.store.default_scope, "nt");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_test_config(
            r#"
            [data]
            data_dir = "local-data"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let overrides = ConfigOverrides {
            data_dir: Some(PathBuf::from("cli-data")),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.data.data_dir, PathBuf::from("cli-data"));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_load_with_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "[ingest]\ndefault_book = \"JHN\"\n").unwrap();

        // A local config exists but is ignored in favor of the explicit file
        create_test_config("[ingest]\ndefault_book = \"LUK\"\n", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_with_file(&path, None).unwrap();
        assert_eq!(config.ingest.default_book, "JHN");

        let missing = loader.load_with_file(&temp.path().join("nope.toml"), None);
        assert!(matches!(missing, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        create_test_config("[store]\ndefault_scope = \"everything\"\n", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_toml_names_file() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config("[store\n", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = ScriptrefConfig::default();
        config.ingest.default_book = "LUK".to_string();
        config.logging.level = "warn".to_string();

        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path(), None).unwrap();

        assert_eq!(loaded.ingest.default_book, "LUK");
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".scriptref/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: ScriptrefConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, ScriptrefConfig::default());
    }

    #[test]
    fn test_init_local_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config("[ingest]\ndefault_book = \"JHN\"\n", temp.path());

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        loader.init_local(temp.path()).unwrap();

        assert!(std::fs::read_to_string(path).unwrap().contains("JHN"));
    }

    #[test]
    fn test_verse_counts_replace_whole_table() {
        let mut base = crate::IngestConfig::default();
        base.verse_counts.insert("1".to_string(), 45);
        base.verse_counts.insert("2".to_string(), 28);

        let mut overlay = crate::IngestConfig::default();
        overlay.verse_counts.insert("1".to_string(), 51);

        let merged = merge_ingest(base, overlay);
        assert_eq!(merged.verse_counts.len(), 1);
        assert_eq!(merged.verse_counts["1"], 51);
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        write_global(&global_dir, "[logging]\nlevel = \"debug\"\n");

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}

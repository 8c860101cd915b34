//! CLI command implementations
//!
//! This module contains all scriptref CLI command implementations.

pub mod add;
pub mod audit;
pub mod config;
pub mod ingest;
pub mod refs;
pub mod repair;
pub mod resolve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use scriptref_config::{ConfigLoader, ScriptrefConfig};
use scriptref_core::{CrossRefStore, NoteIngestor, Registry, Scope, VerseCounts};
use tracing::debug;

use crate::GlobalOptions;

/// Book whose verse counts ship with the core crate.
const MARK: &str = "MRK";

/// Resolve the workspace path from options or current directory.
pub fn resolve_workspace(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref ws) = global.workspace {
        if ws.exists() {
            return Ok(ws.canonicalize()?);
        }
        anyhow::bail!("Workspace '{}' does not exist", ws.display());
    }

    // Default to current directory
    std::env::current_dir().context("Failed to get current directory")
}

/// Load configuration with optional config file override.
pub fn load_config(global: &GlobalOptions, workspace: &Path) -> Result<ScriptrefConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    if let Some(ref config_path) = global.config {
        return loader
            .load_with_file(config_path, Some(&overrides))
            .context("Failed to load config file");
    }

    loader
        .load(workspace, Some(&overrides))
        .context("Failed to load configuration")
}

/// Everything a data command needs: where it runs and how it is configured.
pub struct Session {
    pub workspace: PathBuf,
    pub config: ScriptrefConfig,
    pub quiet: bool,
}

impl Session {
    pub fn new(workspace: PathBuf, config: ScriptrefConfig, quiet: bool) -> Self {
        Self {
            workspace,
            config,
            quiet,
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config.data_dir(&self.workspace)
    }

    /// Registry from the configured book table, or the bundled one when the
    /// table file is absent.
    pub fn registry(&self) -> Registry {
        let path = self.config.book_table_path(&self.workspace);
        if path.exists() {
            Registry::load(&path)
        } else {
            debug!("No book table at {:?}, using bundled table", path);
            Registry::bundled()
        }
    }

    pub fn store(&self) -> CrossRefStore {
        CrossRefStore::new(self.data_dir())
    }

    pub fn default_scope(&self) -> Result<Scope> {
        self.config
            .store
            .default_scope
            .parse()
            .map_err(anyhow::Error::msg)
    }

    /// Ingestor for `book` (or the configured default book).
    pub fn ingestor(
        &self,
        registry: &Registry,
        book: Option<&str>,
        header: Option<&str>,
    ) -> Result<NoteIngestor> {
        let code = resolve_book(registry, book.unwrap_or(self.config.ingest.default_book.as_str()))?;
        let table = self.config.ingest.verse_count_table()?;
        let verse_counts = if !table.is_empty() {
            table.into_iter().collect()
        } else if code == MARK {
            VerseCounts::mark()
        } else {
            VerseCounts::default()
        };
        let header = header.or(self.config.ingest.header_label.as_deref());

        NoteIngestor::new(registry, &code, header, verse_counts)
            .with_context(|| format!("Failed to prepare ingestion for {code}"))
    }

    pub fn info(&self, message: &str) {
        print_info(message, self.quiet);
    }
}

/// Turn a book code or any registered surface form into a book code.
pub fn resolve_book(registry: &Registry, input: &str) -> Result<String> {
    if let Some(book) = registry.book(input) {
        return Ok(book.code.clone());
    }
    registry
        .resolve_code(input)
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("could not resolve: {}", input))
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

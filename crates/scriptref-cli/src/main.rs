//! scriptref CLI - Scripture reference resolution and cross-reference curation
//!
//! A command-line interface for normalizing free-form references, browsing
//! cross-reference collections, and maintaining them by hand or from
//! annotation text.
//!
//! # Usage
//!
//! ```bash
//! # Normalize references
//! scriptref resolve "Mc 1:1" "1 Co 8,12"
//!
//! # List cross-references for a book or a verse
//! scriptref refs Mc --scope nt
//!
//! # Record a relation by hand
//! scriptref add tob "Mc 1:2" "Ml 3:1" --type quotation
//!
//! # Build a collection from annotation notes
//! scriptref ingest notes/marc.txt --collection tob
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use scriptref_config::{LogFormat, LoggingConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::Session;

/// scriptref - Resolve scripture references and curate cross-references
#[derive(Parser, Debug)]
#[command(name = "scriptref")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Workspace directory (holds .scriptref/config.toml and the data dir)
    #[arg(long, short = 'w', global = true, env = "SCRIPTREF_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to configuration file (replaces the workspace config)
    #[arg(long, short = 'c', global = true, env = "SCRIPTREF_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding references_*.json collections
    #[arg(long, global = true, env = "SCRIPTREF_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Book metadata table (JSON)
    #[arg(long, global = true, env = "SCRIPTREF_BOOK_TABLE")]
    book_table: Option<PathBuf>,

    /// Book that ingest, repair and audit use when --book is absent
    #[arg(long, global = true, env = "SCRIPTREF_DEFAULT_BOOK")]
    default_book: Option<String>,

    /// Collections refs loads when --scope is absent (all, nt, ot, generic)
    #[arg(long, global = true, env = "SCRIPTREF_DEFAULT_SCOPE")]
    default_scope: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SCRIPTREF_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> scriptref_config::ConfigOverrides {
        scriptref_config::ConfigOverrides {
            data_dir: self.data_dir.clone(),
            book_table: self.book_table.clone(),
            default_book: self.default_book.clone(),
            default_scope: self.default_scope.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize references to canonical BOOK.C.V form
    Resolve(commands::resolve::ResolveArgs),

    /// List cross-references for a book, chapter or verse
    Refs(commands::refs::RefsArgs),

    /// Record a relation in a collection file
    Add(commands::add::AddArgs),

    /// Build a collection from annotation notes
    Ingest(commands::ingest::IngestArgs),

    /// Insert the missing tab after note markers
    Repair(commands::repair::RepairArgs),

    /// Flag relations whose note text names another book
    Audit(commands::audit::AuditArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let workspace = commands::resolve_workspace(&cli.global)?;
    let config = commands::load_config(&cli.global, &workspace);
    init_logging(&cli.global, config.as_ref().ok().map(|c| &c.logging))?;

    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Resolve(args) => {
            commands::resolve::execute(args, &Session::new(workspace, config?, quiet))
        }
        Commands::Refs(args) => {
            commands::refs::execute(args, &Session::new(workspace, config?, quiet))
        }
        Commands::Add(args) => commands::add::execute(args, &Session::new(workspace, config?, quiet)),
        Commands::Ingest(args) => {
            commands::ingest::execute(args, &Session::new(workspace, config?, quiet))
        }
        Commands::Repair(args) => {
            commands::repair::execute(args, &Session::new(workspace, config?, quiet))
        }
        Commands::Audit(args) => {
            commands::audit::execute(args, &Session::new(workspace, config?, quiet))
        }
        Commands::Config(cmd) => commands::config::execute(cmd, &cli.global, &workspace),
    }
}

/// Install the stderr subscriber.
///
/// `--quiet` and `--verbose` win over the configured level. A config that
/// failed to load leaves the defaults in place so the error itself is still
/// reported.
fn init_logging(global: &GlobalOptions, logging: Option<&LoggingConfig>) -> Result<()> {
    let log_level = if global.quiet {
        Level::ERROR
    } else if global.verbose {
        Level::DEBUG
    } else {
        logging
            .and_then(|l| l.level.parse().ok())
            .unwrap_or(Level::INFO)
    };
    let format = logging.map(|l| l.format).unwrap_or_default();

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(
            builder.with_ansi(std::io::stderr().is_terminal()).finish(),
        )?,
    }
    Ok(())
}

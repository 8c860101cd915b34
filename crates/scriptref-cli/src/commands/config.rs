//! Config command - View and initialize configuration
//!
//! - Show the effective configuration (global, local and CLI overrides merged)
//! - Create a default config file, locally or globally
//! - Show where config files are looked up

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use scriptref_config::ConfigLoader;
use serde::Serialize;

use super::load_config;
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Create a default configuration file
    Init(InitArgs),

    /// Show configuration file paths
    Path(PathArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create ~/.scriptref/config.toml instead of the workspace config
    #[arg(long)]
    global: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: &GlobalOptions, workspace: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global, workspace),
        ConfigCommand::Init(args) => execute_init(args, global, workspace),
        ConfigCommand::Path(args) => execute_path(args, workspace),
    }
}

fn execute_show(args: ShowArgs, global: &GlobalOptions, workspace: &Path) -> Result<()> {
    let config = load_config(global, workspace)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
        print!("{}", rendered);
    }
    Ok(())
}

fn execute_init(args: InitArgs, global: &GlobalOptions, workspace: &Path) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if args.global {
        loader.init_global()?
    } else {
        loader.init_local(workspace)?
    };

    super::print_info(&format!("Config file: {}", path.display()), global.quiet);
    println!("{}", path.display());
    Ok(())
}

fn execute_path(args: PathArgs, workspace: &Path) -> Result<()> {
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(workspace);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        match paths.global {
            Some(ref gp) => {
                let status = if paths.global_exists { "exists" } else { "not found" };
                println!("Global: {} ({})", gp.display(), status);
            }
            None => println!("Global: not available (no home directory)"),
        }

        let status = if paths.local_exists { "exists" } else { "not found" };
        println!("Local:  {} ({})", paths.local.display(), status);
    }
    Ok(())
}

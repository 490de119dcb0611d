//! CLI argument parsing and command dispatch

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deploy_replicator::config::ReplicatorConfig;
use deploy_replicator::output::OutputConfig;

use crate::commands;

/// Deploy Replicator - Discover deployment patterns and replicate them across repositories
#[derive(Parser, Debug)]
#[command(name = "deploy-replicator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Path to a configuration file (defaults to ./.deploy-replicator.yaml when present)
    #[arg(long, global = true, value_name = "FILE", env = "DEPLOY_REPLICATOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect deployment patterns in a repository, optionally saving templates
    Scan(commands::scan::ScanArgs),
    /// Apply saved templates to a target repository
    Apply(commands::apply::ApplyArgs),
    /// Scan a source repository and apply its patterns to a target in one step
    Replicate(commands::replicate::ReplicateArgs),
}

/// Everything a command needs besides its own arguments.
pub struct Globals {
    pub output: OutputConfig,
    pub config: ReplicatorConfig,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// Returns `true` when every result succeeded.
    pub fn execute(self) -> Result<bool> {
        init_logging(&self.log_level);

        let cwd = std::env::current_dir().context("cannot determine the current directory")?;
        let globals = Globals {
            output: OutputConfig::from_env_and_flag(&self.color),
            config: load_config(self.config.as_deref(), &cwd)?,
        };

        match self.command {
            Commands::Scan(args) => commands::scan::execute(args, &globals),
            Commands::Apply(args) => commands::apply::execute(args, &globals),
            Commands::Replicate(args) => commands::replicate::execute(args, &globals),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<ReplicatorConfig> {
    ReplicatorConfig::load(explicit, cwd).with_context(|| match explicit {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })
}

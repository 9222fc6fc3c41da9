//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use mk_core::config::{apply_env_overrides, load_config, load_config_or_default, validate_config};
use mk_core::MkConfig;

use commands::{CompletionsCommand, InitCommand, RunCommand, StylesCommand};

/// mk - Run external build tools with logged, notified output
#[derive(Debug, Parser)]
#[command(name = "mk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress console output; history is still logged
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: nearest mk.toml or .mk.toml)
    #[arg(long, global = true, env = "MK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append console history to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// History fragments buffered before each log write
    #[arg(long, global = true)]
    pub flush_capacity: Option<usize>,

    /// Disable desktop notifications
    #[arg(long, global = true)]
    pub no_notify: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run an external program with a banner, streamed output and a final report
    Run(RunCommand),

    /// Print a sample line for every console style
    Styles(StylesCommand),

    /// Write a default mk.toml
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Whether the command runs under a script lifecycle that receives signals
    pub fn intercepts_signals(&self) -> bool {
        matches!(self.command, Commands::Run(_))
    }

    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> anyhow::Result<i32> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("Unable to change directory to {}", dir.display()))?;
        }

        match self.command {
            Commands::Run(ref cmd) => cmd.execute(&self),
            Commands::Styles(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }

    /// Configuration from file, environment and global flags, in increasing precedence
    pub fn load_config(&self) -> anyhow::Result<MkConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Unable to load {}", path.display()))?,
            None => {
                let cwd = std::env::current_dir()?;
                load_config_or_default(&cwd).0
            }
        };

        apply_env_overrides(&mut config);
        if let Some(file) = &self.log_file {
            config.log.file = Some(file.clone());
        }
        if let Some(capacity) = self.flush_capacity {
            config.log.flush_capacity = capacity;
        }
        if self.no_notify {
            config.notifications.enabled = false;
        }

        validate_config(&config).context("Invalid configuration")?;
        debug!(?config, "effective configuration");
        Ok(config)
    }
}

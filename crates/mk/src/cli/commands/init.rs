//! Init command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use mk_core::config::defaults::{DEFAULT_CONFIG_FILE, DEFAULT_CONFIG_TEMPLATE};

use crate::cli::{output, Cli};
use crate::exit_codes;

/// Write a default mk.toml
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(force = self.force, "executing init command");
        let config_path = self.config_path()?;

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
            .with_context(|| format!("Unable to write {}", config_path.display()))?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(config_path.display())
            ));
            println!();
            println!("Next steps:");
            println!(
                "  1. Set [log] directory in {} to keep a history of every run",
                config_path.display()
            );
            println!(
                "  2. Run {} to try it",
                output::command_style().apply_to("mk run --title Hello -- echo hello")
            );
        }

        Ok(exit_codes::SUCCESS)
    }

    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.output {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?.join(DEFAULT_CONFIG_FILE)),
        }
    }
}

//! Styles command

use clap::Args;
use tracing::info;

use mk_core::Console;

use crate::cli::Cli;
use crate::exit_codes;

/// Print a sample line for every console style
#[derive(Debug, Args)]
pub struct StylesCommand {}

impl StylesCommand {
    /// Execute the styles command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!("executing styles command");
        let config = cli.load_config()?;
        config.console.color.apply();

        let console = if cli.quiet {
            Console::hidden()
        } else {
            Console::terminal()
        };
        console.dump_styles();
        Ok(exit_codes::SUCCESS)
    }
}

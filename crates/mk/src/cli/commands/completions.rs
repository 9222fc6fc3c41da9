//! Shell completions generation command

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Generator, Shell};
use tracing::info;

use crate::cli::{output, Cli};
use crate::exit_codes;

/// Generate shell completions
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write to this file instead of stdout
    #[arg(short, long, conflicts_with = "dir")]
    pub output: Option<PathBuf>,

    /// Write into this directory under the shell's conventional file name
    /// (`mk.bash`, `_mk`, `mk.fish`, ...)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(shell = %self.shell, "executing completions command");

        match self.target() {
            Some(path) => {
                let mut file = std::fs::File::create(&path)
                    .with_context(|| format!("Unable to create {}", path.display()))?;
                write_completions(self.shell, &mut file);
                if !cli.quiet {
                    output::success(&format!(
                        "{} completions written to {}",
                        self.shell,
                        output::path_style().apply_to(path.display())
                    ));
                }
            }
            None => write_completions(self.shell, &mut std::io::stdout()),
        }

        Ok(exit_codes::SUCCESS)
    }

    fn target(&self) -> Option<PathBuf> {
        match (&self.output, &self.dir) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(dir)) => Some(completion_path(self.shell, dir)),
            (None, None) => None,
        }
    }
}

/// `dir` joined with the file name `shell` loads completions for `mk` from
fn completion_path(shell: Shell, dir: &Path) -> PathBuf {
    dir.join(shell.file_name(&bin_name()))
}

fn bin_name() -> String {
    Cli::command().get_name().to_string()
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, bin_name(), out);
}

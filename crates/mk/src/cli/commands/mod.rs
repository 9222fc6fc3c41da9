//! CLI commands

mod completions;
mod init;
mod run;
mod styles;

pub use completions::CompletionsCommand;
pub use init::InitCommand;
pub use run::RunCommand;
pub use styles::StylesCommand;

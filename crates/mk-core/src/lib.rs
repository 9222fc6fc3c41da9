//! mk Core - Core library for developer automation scripts
//!
//! This crate provides the process runner, the console sink with its
//! persistent history, and the script lifecycle controller that guarantees a
//! single final report (banner, log flush, desktop notification) however a
//! script ends.

pub mod config;
pub mod console;
pub mod error;
pub mod format;
pub mod fs;
pub mod notification;
pub mod runner;
pub mod script;
pub mod time;

pub use config::{load_config_or_default, MkConfig};
pub use console::{Console, ConsoleStyle};
pub use error::{ConfigError, Error, IoFailure, Result};
pub use format::{InfoTable, InfoValue};
pub use fs::{FsPath, PathLike};
pub use notification::{DesktopNotifier, NoopNotifier, Notifier};
pub use runner::{CommandSpec, ExecResult, IntoArg, RunOptions, Runner};
pub use script::{ExitReason, Script, ScriptBuilder};
pub use time::{Elapsed, TimeCounter};

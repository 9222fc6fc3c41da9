//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::console::DEFAULT_FLUSH_CAPACITY;
use crate::script::ExitActions;
use crate::time::LocalTimestamp;

/// Main configuration for mk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MkConfig {
    /// Persistent console history
    pub log: LogConfig,

    /// Desktop notifications at script termination
    pub notifications: NotificationsConfig,

    /// Display surface
    pub console: ConsoleConfig,
}

/// Persistent console history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Explicit log file; takes precedence over `directory`
    pub file: Option<PathBuf>,

    /// Directory receiving one timestamped log file per script run
    pub directory: Option<PathBuf>,

    /// History fragments buffered before an automatic flush
    pub flush_capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            directory: None,
            flush_capacity: DEFAULT_FLUSH_CAPACITY,
        }
    }
}

impl LogConfig {
    /// Log file for a run of `script_name`, if history is configured.
    ///
    /// Directory logs are named `{script}_{%Y.%m.%d_%H.%M}.log`.
    pub fn log_file_for(&self, script_name: &str, started: &LocalTimestamp) -> Option<PathBuf> {
        if let Some(file) = &self.file {
            return Some(file.clone());
        }
        self.directory.as_deref().map(|dir: &Path| {
            dir.join(format!("{}_{}.log", script_name, started.log_file_stamp()))
        })
    }
}

/// Notification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Send desktop notifications at all
    pub enabled: bool,

    /// Icon attached to success notifications
    pub success_icon: Option<PathBuf>,

    /// Icon attached to failure notifications
    pub error_icon: Option<PathBuf>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            success_icon: None,
            error_icon: None,
        }
    }
}

impl NotificationsConfig {
    /// Exit actions carrying the configured icons, or no notifications when disabled
    pub fn exit_actions(&self) -> ExitActions {
        let actions = ExitActions::with_icons(self.success_icon.clone(), self.error_icon.clone());
        if self.enabled {
            actions
        } else {
            actions.without_notifications()
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Color output
    pub color: ColorChoice,
}

/// When to emit ANSI colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Colors when the output is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Apply process-wide to the console crate
    pub fn apply(&self) {
        match self {
            Self::Auto => {}
            Self::Always => {
                console::set_colors_enabled(true);
                console::set_colors_enabled_stderr(true);
            }
            Self::Never => {
                console::set_colors_enabled(false);
                console::set_colors_enabled_stderr(false);
            }
        }
    }
}

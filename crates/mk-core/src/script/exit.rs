//! Exit reasons and the actions taken for each

use std::fmt;
use std::path::PathBuf;

use crate::console::ConsoleStyle;
use crate::notification::{NotificationConfig, NotificationSound};

/// Why a script frame is terminating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// Body returned normally
    Finished,
    /// Explicit `success`
    Completed,
    /// Explicit `die` or an error reaching the top of the script
    Died,
    /// SIGTERM
    Terminated,
    /// SIGINT
    InterruptedByUser,
    UncaughtPanic,
}

impl ExitReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Completed => "completed",
            Self::Died => "died",
            Self::Terminated => "terminated",
            Self::InterruptedByUser => "is interrupted by user",
            Self::UncaughtPanic => "is interrupted by uncaught exception",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Finished | Self::Completed)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Banner style and notification for one exit reason; both optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitAction {
    pub style: Option<ConsoleStyle>,
    pub notification: Option<NotificationConfig>,
}

impl ExitAction {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn new(style: ConsoleStyle, notification: NotificationConfig) -> Self {
        Self {
            style: Some(style),
            notification: Some(notification),
        }
    }
}

/// Exit actions keyed by reason
#[derive(Debug, Clone, PartialEq)]
pub struct ExitActions {
    pub finished: ExitAction,
    pub success: ExitAction,
    pub failure: ExitAction,
}

impl ExitActions {
    /// Defaults with the given notification icons
    pub fn with_icons(success_icon: Option<PathBuf>, error_icon: Option<PathBuf>) -> Self {
        let mut success = NotificationConfig::new(NotificationSound::Success);
        success.icon = success_icon;
        let mut failure = NotificationConfig::new(NotificationSound::Error);
        failure.icon = error_icon;
        Self {
            finished: ExitAction::silent(),
            success: ExitAction::new(ConsoleStyle::Success, success),
            failure: ExitAction::new(ConsoleStyle::FatalError, failure),
        }
    }

    /// Strip every notification, keeping banner styles
    pub fn without_notifications(mut self) -> Self {
        self.finished.notification = None;
        self.success.notification = None;
        self.failure.notification = None;
        self
    }

    pub fn for_reason(&self, reason: ExitReason) -> &ExitAction {
        match reason {
            ExitReason::Finished => &self.finished,
            ExitReason::Completed => &self.success,
            ExitReason::Died
            | ExitReason::Terminated
            | ExitReason::InterruptedByUser
            | ExitReason::UncaughtPanic => &self.failure,
        }
    }
}

impl Default for ExitActions {
    fn default() -> Self {
        Self::with_icons(None, None)
    }
}

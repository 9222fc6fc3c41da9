//! Desktop notifications
//!
//! The lifecycle controller reports the end of a run through a [`Notifier`].
//! [`DesktopNotifier`] delivers through the platform notification center via
//! notify-rust; [`MemoryNotifier`] records calls for tests.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Notification sound category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSound {
    Error,
    Success,
}

impl NotificationSound {
    /// Platform sound name
    pub fn system_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            match self {
                Self::Error => "Sosumi",
                Self::Success => "Glass",
            }
        } else {
            match self {
                Self::Error => "dialog-error",
                Self::Success => "complete",
            }
        }
    }
}

/// Sound and icon attached to a notification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationConfig {
    pub sound: Option<NotificationSound>,
    pub icon: Option<PathBuf>,
}

impl NotificationConfig {
    pub fn new(sound: NotificationSound) -> Self {
        Self {
            sound: Some(sound),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<PathBuf>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A notification ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub sound: Option<NotificationSound>,
    pub icon: Option<PathBuf>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        subtitle: Option<String>,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            message: message.into(),
            title: title.into(),
            subtitle,
            sound: config.sound,
            icon: config.icon.clone(),
        }
    }
}

/// Delivers notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Desktop notification center via notify-rust.
///
/// On macOS the first `show()` looks up a bundle identifier through
/// AppleScript, which blocks forever without Automation permissions. The
/// identifier is set up front so a terminating script cannot hang there.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            // fails when already set, which is fine
            if let Err(e) = notify_rust::set_application(MACOS_BUNDLE_ID) {
                tracing::debug!(error = %e, "notification bundle identifier not set");
            }
        }
        Self
    }
}

#[cfg(target_os = "macos")]
const MACOS_BUNDLE_ID: &str = "com.apple.Terminal";

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut n = notify_rust::Notification::new();
        n.summary(&notification.title);

        #[cfg(target_os = "macos")]
        {
            n.body(&notification.message);
            if let Some(subtitle) = &notification.subtitle {
                n.subtitle(subtitle);
            }
            if let Some(sound) = notification.sound {
                n.sound_name(sound.system_name());
            }
        }

        #[cfg(not(target_os = "macos"))]
        {
            // No subtitle line outside macOS: it leads the body instead.
            let body = match &notification.subtitle {
                Some(subtitle) => format!("{subtitle}\n{}", notification.message),
                None => notification.message.clone(),
            };
            n.body(&body);
            #[cfg(all(unix, not(target_os = "macos")))]
            {
                if let Some(sound) = notification.sound {
                    n.hint(notify_rust::Hint::SoundName(sound.system_name().to_string()));
                }
            }
        }

        if let Some(icon) = &notification.icon {
            n.icon(&icon.to_string_lossy());
        }

        info!(title = %notification.title, "sending desktop notification");
        match n.show() {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(title = %notification.title, error = %e, "desktop notification failed");
                Err(NotifyError::SendFailed(e.to_string()))
            }
        }
    }
}

/// Discards notifications
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Notification, Notifier, NotifyError};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Records every notification it receives
    #[derive(Clone, Default)]
    pub struct MemoryNotifier {
        calls: Arc<Mutex<Vec<Notification>>>,
    }

    impl MemoryNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<Notification> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Notifier for MemoryNotifier {
        fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notification.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::MemoryNotifier;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_takes_config() {
        let config = NotificationConfig::new(NotificationSound::Error).with_icon("/tmp/error.png");
        let n = Notification::new("BUILD died", "Execution time 0:00:01.000", None, &config);
        assert_eq!(n.sound, Some(NotificationSound::Error));
        assert_eq!(n.icon, Some(PathBuf::from("/tmp/error.png")));
        assert_eq!(n.title, "BUILD died");
    }

    #[test]
    fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        let n = Notification::new("t", "m", Some("d".to_string()), &NotificationConfig::default());
        notifier.notify(&n).unwrap();
        notifier.notify(&n).unwrap();
        assert_eq!(notifier.calls().len(), 2);
        assert_eq!(notifier.calls()[0].subtitle.as_deref(), Some("d"));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_desktop_notifier_presets_bundle_identifier() {
        let _notifier = DesktopNotifier::new();
        // a second registration is refused once the identifier is in place
        assert!(notify_rust::set_application(MACOS_BUNDLE_ID).is_err());
    }

    #[test]
    fn test_sound_names_are_distinct() {
        assert_ne!(
            NotificationSound::Error.system_name(),
            NotificationSound::Success.system_name()
        );
    }
}

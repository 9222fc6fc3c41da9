//! Configuration validation

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::MkConfig;

/// Validate configuration
pub fn validate_config(config: &MkConfig) -> Result<()> {
    debug!("validating configuration");
    validate_log(config)?;
    validate_notifications(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_log(config: &MkConfig) -> Result<()> {
    if config.log.flush_capacity < 1 {
        return Err(ConfigError::InvalidValue {
            field: "log.flush_capacity".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if let Some(file) = &config.log.file {
        if is_blank(file) {
            return Err(ConfigError::InvalidValue {
                field: "log.file".to_string(),
                message: "path cannot be empty".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_notifications(config: &MkConfig) -> Result<()> {
    let icons = [
        ("notifications.success_icon", &config.notifications.success_icon),
        ("notifications.error_icon", &config.notifications.error_icon),
    ];
    for (field, icon) in icons {
        if icon.as_deref().is_some_and(is_blank) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "icon path cannot be empty".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

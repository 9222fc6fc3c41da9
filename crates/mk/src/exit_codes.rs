//! Exit codes for the CLI

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Exit code for an error that escaped command execution
pub fn for_error(err: &anyhow::Error) -> i32 {
    let is_config = err.chain().any(|cause| {
        matches!(cause.downcast_ref::<mk_core::Error>(), Some(mk_core::Error::Config(_)))
            || cause.downcast_ref::<mk_core::ConfigError>().is_some()
    });
    if is_config {
        CONFIG_ERROR
    } else {
        ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_config_errors_map_to_config_code() {
        let err: anyhow::Error = mk_core::Error::from(mk_core::ConfigError::InvalidValue {
            field: "log.flush_capacity".to_string(),
            message: "must be at least 1".to_string(),
        })
        .into();
        assert_eq!(for_error(&err), CONFIG_ERROR);

        let wrapped = Err::<(), _>(err).context("loading mk.toml").unwrap_err();
        assert_eq!(for_error(&wrapped), CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors_map_to_error_code() {
        assert_eq!(for_error(&anyhow::anyhow!("boom")), ERROR);
        assert_ne!(SUCCESS, ERROR);
    }
}

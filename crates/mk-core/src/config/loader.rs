//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::{config_file_names, ENV_LOG_FILE, ENV_NO_NOTIFY};
use super::types::MkConfig;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<MkConfig> {
    info!(path = %path.display(), "loading config");

    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }
    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: MkConfig = toml::from_str(&content).map_err(ConfigError::TomlError)?;

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// `mk.toml` wins over `.mk.toml` at the same level; the nearest level wins
/// overall.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(MkConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults
pub fn load_config_or_default(dir: &Path) -> (MkConfig, Option<PathBuf>) {
    match load_config_from_dir(dir) {
        Ok((config, path)) => (config, Some(path)),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "no usable config found, using defaults");
            (MkConfig::default(), None)
        }
    }
}

/// Apply `MK_LOG_FILE` and `MK_NO_NOTIFY` from the process environment
pub fn apply_env_overrides(config: &mut MkConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply environment-style overrides read through `lookup`
pub fn apply_overrides_from(config: &mut MkConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(file) = lookup(ENV_LOG_FILE).filter(|v| !v.trim().is_empty()) {
        debug!(file = %file, "log file overridden from environment");
        config.log.file = Some(PathBuf::from(file));
    }
    if lookup(ENV_NO_NOTIFY).is_some_and(|v| is_truthy(&v)) {
        debug!("notifications disabled from environment");
        config.notifications.enabled = false;
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("mk.toml");
        std::fs::write(&config_path, "[log]\nflush_capacity = 4").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_visible_name() {
        let temp = TempDir::new().unwrap();
        let visible = temp.path().join("mk.toml");
        let hidden = temp.path().join(".mk.toml");
        std::fs::write(&visible, "").unwrap();
        std::fs::write(&hidden, "").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), visible);
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".mk.toml");
        std::fs::write(&config_path, "").unwrap();
        let nested = temp.path().join("ios/scripts");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested).unwrap(), config_path);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("mk.toml");
        std::fs::write(
            &config_path,
            "[log]\ndirectory = \"logs\"\nflush_capacity = 8\n\n[notifications]\nenabled = false\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.log.directory, Some(PathBuf::from("logs")));
        assert_eq!(config.log.flush_capacity, 8);
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("mk.toml");
        std::fs::write(&config_path, "[log]\nflush_capacity = 0\n").unwrap();
        assert!(load_config(&config_path).is_err());

        std::fs::write(&config_path, "[log\n").unwrap();
        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path());
        assert_eq!(config, MkConfig::default());
        assert!(path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_LOG_FILE, "/tmp/run.log"), (ENV_NO_NOTIFY, "1")]
            .into_iter()
            .collect();
        let mut config = MkConfig::default();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/run.log")));
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn test_env_overrides_ignore_falsy() {
        let mut config = MkConfig::default();
        apply_overrides_from(&mut config, |k| {
            (k == ENV_NO_NOTIFY).then(|| "0".to_string())
        });
        assert!(config.notifications.enabled);
        assert!(config.log.file.is_none());
    }
}

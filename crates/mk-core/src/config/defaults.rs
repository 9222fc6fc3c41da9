//! Default configuration values

use super::types::MkConfig;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "mk.toml";

/// Alternative (hidden) configuration file name
pub const ALT_CONFIG_FILE: &str = ".mk.toml";

/// Environment variable overriding `log.file`
pub const ENV_LOG_FILE: &str = "MK_LOG_FILE";

/// Environment variable disabling notifications when set to a truthy value
pub const ENV_NO_NOTIFY: &str = "MK_NO_NOTIFY";

/// Config file names searched at each directory level, in priority order
pub fn config_file_names() -> [&'static str; 2] {
    [DEFAULT_CONFIG_FILE, ALT_CONFIG_FILE]
}

/// Default configuration rendered as TOML
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&MkConfig::default())
        .unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# mk configuration

[log]
# file = "build.log"
# directory = "~/.mk/history"
flush_capacity = 1

[notifications]
enabled = true
# success_icon = "assets/success.png"
# error_icon = "assets/error.png"

[console]
color = "auto"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config: MkConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, MkConfig::default());
    }

    #[test]
    fn test_rendered_defaults_round_trip() {
        let config: MkConfig = toml::from_str(&default_config_toml()).unwrap();
        assert_eq!(config, MkConfig::default());
    }
}

//! Configuration management

use secretgate_core::{PrefixRule, SecretNaming};
use secretgate_secretsmanager::{SecretTag, SecretsDefaults};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub store: StoreDefaultsConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreDefaultsConfig {
    #[serde(default = "default_region")]
    pub default_region: String,

    #[serde(default = "default_base_path")]
    pub default_base_path: String,

    #[serde(default)]
    pub prefix_rule: PrefixRule,

    #[serde(default = "default_tag_key")]
    pub created_by_tag_key: String,

    #[serde(default = "default_tag_value")]
    pub created_by_tag_value: String,
}

impl Default for StoreDefaultsConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            default_base_path: default_base_path(),
            prefix_rule: PrefixRule::default(),
            created_by_tag_key: default_tag_key(),
            created_by_tag_value: default_tag_value(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    secretgate_secretsmanager::client::DEFAULT_REGION.to_string()
}

fn default_base_path() -> String {
    secretgate_core::addressing::DEFAULT_BASE_PATH.to_string()
}

fn default_tag_key() -> String {
    "createdBy".to_string()
}

fn default_tag_value() -> String {
    "Harness".to_string()
}

impl Config {
    /// Load configuration from an optional file and the environment
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("secretgate").required(false))
            .add_source(config::Environment::with_prefix("SECRETGATE").separator("__"))
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }

    /// Defaults handed to every secret task
    pub fn secrets_defaults(&self) -> SecretsDefaults {
        SecretsDefaults {
            default_region: self.store.default_region.clone(),
            naming: SecretNaming {
                default_base_path: self.store.default_base_path.clone(),
                rule: self.store.prefix_rule,
            },
            creation_tag: SecretTag::new(
                self.store.created_by_tag_key.clone(),
                self.store.created_by_tag_value.clone(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_defaults() {
        let defaults = Config::default().secrets_defaults();
        let service = SecretsDefaults::default();

        assert_eq!(defaults.default_region, service.default_region);
        assert_eq!(defaults.naming, service.naming);
        assert_eq!(defaults.creation_tag, service.creation_tag);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let source = config::Config::builder()
            .add_source(config::File::from_str(
                "[store]\nprefix_rule = \"trim_trailing\"\ndefault_base_path = \"vault\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = source.try_deserialize().unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.store.default_region, "us-east-1");
        assert_eq!(config.store.prefix_rule, PrefixRule::TrimTrailing);

        let naming = config.secrets_defaults().naming;
        assert_eq!(naming.qualify("", "db"), "vault/db");
        assert_eq!(naming.qualify("/team/", "db"), "/team/db");
    }
}

//! Runtime configuration for the yamlvus tools.
//!
//! The only runtime input the schema pipeline needs from its environment is the
//! version of the engine SDK it targets, which gates optional field and index
//! types. It is read from an optional YAML file merged with `YAMLVUS_`
//! environment variables.

use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use yamlvus_error::{ErrorCodes, YamlvusError};

pub const DEFAULT_CONFIG_PATH: &str = "./yamlvus.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error loading config: {0}")]
    Extract(#[from] Box<figment::Error>),
}

impl YamlvusError for ConfigError {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::InvalidArgument
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
/// Root config for the yamlvus tools.  Can be part of a larger config file.
pub struct RootConfig {
    #[serde(default)]
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SchemaConfig {
    /// Installed engine SDK version, e.g. "2.6.0". Unset means the built-in default.
    #[serde(default, deserialize_with = "deserialize_version")]
    pub engine_version: Option<String>,
}

impl RootConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Values in the environment take precedence over values in the YAML file.
    /// A missing file is not an error.
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        // Unfortunately, figment doesn't support environment variables with underscores. So we have to map and replace them.
        let mut f = figment::Figment::from(
            Env::prefixed("YAMLVUS_").map(|k| k.as_str().replace("__", ".").into()),
        );
        if std::path::Path::new(path).exists() {
            f = figment::Figment::from(Yaml::file(path)).merge(f);
        }
        f.extract().map_err(|e| ConfigError::Extract(Box::new(e)))
    }
}

// Figment parses bare env values, so "2" or "2.5" arrive as numbers.
fn deserialize_version<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawVersion {
        Text(String),
        Int(u64),
        Float(f64),
    }

    let raw: Option<RawVersion> = Option::deserialize(d)?;
    Ok(raw.map(|raw| match raw {
        RawVersion::Text(text) => text,
        RawVersion::Int(major) => major.to_string(),
        RawVersion::Float(value) => value.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = RootConfig::load().expect("config should load");
            assert_eq!(config, RootConfig::default());
            assert!(config.schema.engine_version.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "yamlvus.yaml",
                r#"
                schema:
                    engine_version: "2.5.4"
                "#,
            )?;
            let config = RootConfig::load().expect("config should load");
            assert_eq!(config.schema.engine_version.as_deref(), Some("2.5.4"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.yaml",
                r#"
                schema:
                    engine_version: "2.5.4"
                "#,
            )?;
            jail.set_env("YAMLVUS_SCHEMA__ENGINE_VERSION", "2.6.1");
            let config = RootConfig::load_from_path("custom.yaml").expect("config should load");
            assert_eq!(config.schema.engine_version.as_deref(), Some("2.6.1"));
            Ok(())
        });
    }

    #[test]
    fn test_numeric_env_version_is_accepted() {
        Jail::expect_with(|jail| {
            jail.set_env("YAMLVUS_SCHEMA__ENGINE_VERSION", "3");
            let config = RootConfig::load().expect("config should load");
            assert_eq!(config.schema.engine_version.as_deref(), Some("3"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "yamlvus.yaml",
                r#"
                schema:
                    engine_version:
                        nested: true
                "#,
            )?;
            let err = RootConfig::load().expect_err("nested mapping is not a version");
            assert_eq!(err.code(), ErrorCodes::InvalidArgument);
            assert!(err.to_string().starts_with("Error loading config"));
            Ok(())
        });
    }
}

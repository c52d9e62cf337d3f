use std::io;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use yamlvus_config::{ConfigError, RootConfig, DEFAULT_CONFIG_PATH};
use yamlvus_error::{ErrorCodes, YamlvusError};
use yamlvus_schema::{EngineCompat, SchemaError, VersionParseError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid engine version: {0}")]
    EngineVersion(#[from] VersionParseError),
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize schema: {0}")]
    Json(#[from] serde_json::Error),
}

impl YamlvusError for CliError {
    fn code(&self) -> ErrorCodes {
        match self {
            CliError::Schema(e) => e.code(),
            CliError::Config(e) => e.code(),
            CliError::EngineVersion(_) => ErrorCodes::InvalidArgument,
            CliError::Io(e) => e.code(),
            CliError::Json(_) => ErrorCodes::Internal,
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
pub struct EngineArgs {
    #[arg(
        long = "engine-version",
        global = true,
        help = "Installed engine SDK version, e.g. 2.6.0"
    )]
    pub engine_version: Option<String>,
    #[arg(long = "config", global = true, help = "Path to a yamlvus config file")]
    pub config_path: Option<String>,
}

impl EngineArgs {
    /// The flag wins over the config file and environment, which win over the
    /// built-in default.
    pub fn compat(&self) -> Result<EngineCompat, CliError> {
        let version = match &self.engine_version {
            Some(version) => Some(version.clone()),
            None => {
                let path = self.config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
                RootConfig::load_from_path(path)?.schema.engine_version
            }
        };
        match version {
            Some(version) => Ok(EngineCompat::new(&version)?),
            None => Ok(EngineCompat::default()),
        }
    }
}

/// Logs go to stderr so command output stays clean. `RUST_LOG` wins when set.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

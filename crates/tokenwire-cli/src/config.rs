//! CLI configuration
//!
//! Layered as defaults, then an optional file, then `TOKENWIRE_` environment
//! variables (`TOKENWIRE_AGGREGATOR__URL`, `TOKENWIRE_POLLER__DEADLINE_SECS`).
//! Command-line flags override the result.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokenwire_aggregator::AggregatorConfig;
use tokenwire_proof::PollerConfig;
use tokenwire_types::TrustBase;

use crate::error::{CliError, CliResult};
use crate::files;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    /// JSON trust base file. Required by every command that validates proofs.
    #[serde(default)]
    pub trust_base_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CliConfig {
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TOKENWIRE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CliConfig = builder.build()?.try_deserialize()?;
        config
            .poller
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load the configured trust base.
    pub fn trust_base(&self) -> CliResult<TrustBase> {
        let path = self
            .trust_base_path
            .as_ref()
            .ok_or_else(|| CliError::Config("trust_base_path is not set".into()))?;
        files::read_json(path)
    }
}

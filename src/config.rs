//! # Reporter Configuration
//!
//! Values consumed by the reporting core. Loading is layered: built-in defaults,
//! then an optional TOML file, then `RP__*` environment variables (double underscore
//! separates nested keys).

use crate::error::{ReportingError, ReportingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default number of log entries per dispatched batch
pub const DEFAULT_BATCH_LOG_SIZE: usize = 10;
/// Default wait for the launch-finish chain, in seconds
pub const DEFAULT_REPORTING_TIMEOUT_SECS: u64 = 5 * 60;
/// Default attempts for an item finish rejected with `FINISH_ITEM_NOT_ALLOWED`
pub const DEFAULT_ITEM_FINISH_MAX_ATTEMPTS: u32 = 10;
/// Default spacing between item finish attempts
pub const DEFAULT_ITEM_FINISH_RETRY_DELAY_MS: u64 = 10_000;

/// Launch mode as understood by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaunchMode {
    #[default]
    Default,
    Debug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub launch_name: String,
    pub description: Option<String>,
    pub attributes: Vec<String>,
    pub mode: LaunchMode,
    /// When false, skipped items are marked `NOT_ISSUE`
    pub skipped_is_issue: bool,
    pub batch_log_size: usize,
    pub convert_image: bool,
    pub reporting_timeout_secs: u64,
    /// Stop the launch instead when finishing is rejected with `INCORRECT_FINISH_STATUS`
    pub force_finish_launch: bool,
    /// Attach to a previously recorded launch instead of starting a new one
    pub rerun: bool,
    pub item_finish_max_attempts: u32,
    pub item_finish_retry_delay_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            launch_name: "launch".to_string(),
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
            skipped_is_issue: true,
            batch_log_size: DEFAULT_BATCH_LOG_SIZE,
            convert_image: false,
            reporting_timeout_secs: DEFAULT_REPORTING_TIMEOUT_SECS,
            force_finish_launch: false,
            rerun: false,
            item_finish_max_attempts: DEFAULT_ITEM_FINISH_MAX_ATTEMPTS,
            item_finish_retry_delay_ms: DEFAULT_ITEM_FINISH_RETRY_DELAY_MS,
        }
    }
}

impl ReporterConfig {
    /// Load configuration from an optional TOML file and `RP__*` environment variables
    pub fn load(config_path: Option<&Path>) -> ReportingResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            debug!(path = %path.display(), "Loading reporter configuration file");
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("RP")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("attributes")
                .try_parsing(true),
        );

        let config: ReporterConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReportingResult<()> {
        if self.batch_log_size == 0 {
            return Err(ReportingError::configuration(
                "batch_log_size must be greater than zero",
            ));
        }
        if self.reporting_timeout_secs == 0 {
            return Err(ReportingError::configuration(
                "reporting_timeout_secs must be greater than zero",
            ));
        }
        if self.item_finish_max_attempts == 0 {
            return Err(ReportingError::configuration(
                "item_finish_max_attempts must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn reporting_timeout(&self) -> Duration {
        Duration::from_secs(self.reporting_timeout_secs)
    }

    pub fn item_finish_retry_delay(&self) -> Duration {
        Duration::from_millis(self.item_finish_retry_delay_ms)
    }
}

//! # Structured Logging Module
//!
//! Environment-aware structured logging for the reporting pipeline, plus the
//! helpers used to log how each remote call settled.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::ReportingError;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Console output is always installed; a JSON layer is added when `RP_LOG_JSON` is
/// set. `RUST_LOG` overrides the environment's default level.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json_output = std::env::var("RP_LOG_JSON").is_ok();

        let filter =
            || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let console = (!json_output).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter())
        });
        let json = json_output.then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter())
        });

        // A host test framework may already own the global subscriber
        if tracing_subscriber::registry()
            .with(console)
            .with(json)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            json = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("RP_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log the creation of a remote entity (launch, item, log entry)
pub fn log_created(entity: &str, id: &str) {
    tracing::debug!(entity = %entity, id = %id, "📋 {} created", entity);
}

/// Log a remote operation that completed successfully
pub fn log_completed(operation: &str, target: &str, message: Option<&str>) {
    tracing::info!(
        operation = %operation,
        target_id = %target,
        message = message,
        "✅ {} completed",
        operation
    );
}

/// Log a failed operation that is absorbed rather than propagated
pub fn log_failure(operation: &str, error: &ReportingError) {
    tracing::error!(
        operation = %operation,
        error = %error,
        error_type = error.error_type().map(|t| t.code()),
        "❌ {} failed",
        operation
    );
}

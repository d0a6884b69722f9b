//! # Design
//!
//! - Centralize application-level errors for the startup harness.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Environment configuration held an unusable value.
    #[error("invalid environment configuration")]
    InvalidEnv {
        /// Name of the environment variable.
        name: &'static str,
        /// Offending value.
        value: String,
    },
    /// Settings resolution failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: stowage_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: stowage_telemetry::TelemetryError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// YAML settings file could not be parsed.
    #[error("failed to parse yaml settings")]
    Yaml {
        /// Settings file path.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// JSON parsing or rendering failed.
    #[error("json operation failed")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// Settings file extension was not recognised.
    #[error("unsupported settings file format")]
    UnsupportedFormat {
        /// Settings file path.
        path: PathBuf,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: stowage_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: stowage_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn json(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Json { operation, source }
    }
}

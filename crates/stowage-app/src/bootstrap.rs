//! Startup sequence: read the environment, load the settings file, install
//! logging, resolve object storage settings once, and emit the result.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use stowage_config::{ObjectStoreSettings, ResolvedSettings, ResolverOptions};
use stowage_telemetry::{LogFormat, LoggingConfig};
use tracing::{error, info, instrument};

use crate::error::{AppError, AppResult};

const CONFIG_ENV: &str = "STOWAGE_CONFIG";
const STRICT_ENV: &str = "STOWAGE_STRICT";
const LOG_FORMAT_ENV: &str = "STOWAGE_LOG_FORMAT";

/// Inputs required to run the startup harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Settings file to resolve (`.yml`, `.yaml` or `.json`).
    pub config_path: PathBuf,
    /// Resolver switches.
    pub resolver: ResolverOptions,
    /// Log output format.
    pub log_format: LogFormat,
}

impl BootstrapOptions {
    /// Read options from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `STOWAGE_CONFIG` is unset or a flag holds an
    /// unrecognised value.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let config_path = lookup(CONFIG_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(AppError::MissingEnv { name: CONFIG_ENV })?;

        let strict = match lookup(STRICT_ENV).as_deref().map(str::trim) {
            None | Some("" | "0" | "false") => false,
            Some("1" | "true") => true,
            Some(other) => {
                return Err(AppError::InvalidEnv {
                    name: STRICT_ENV,
                    value: other.to_string(),
                });
            }
        };

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(value) => value
                .parse()
                .map_err(|err| AppError::telemetry("log_format.parse", err))?,
            None => LogFormat::infer(),
        };

        Ok(Self {
            config_path,
            resolver: ResolverOptions { strict },
            log_format,
        })
    }
}

/// Load a settings file into an in-memory tree, choosing the parser by extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unknown extension, or
/// fails to parse.
pub fn load_settings_tree(path: &Path) -> AppResult<Value> {
    let text = fs::read_to_string(path).map_err(|source| AppError::Io {
        operation: "settings.read",
        path: Some(path.to_path_buf()),
        source,
    })?;

    match path.extension().and_then(OsStr::to_str) {
        Some("yml" | "yaml") => serde_yaml::from_str(&text).map_err(|source| AppError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        Some("json") => {
            serde_json::from_str(&text).map_err(|err| AppError::json("settings.parse", err))
        }
        _ => Err(AppError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Load and resolve the settings file named in `options`.
///
/// # Errors
///
/// Returns an error if loading fails or the settings are invalid.
#[instrument(name = "bootstrap.resolve", skip(options), fields(path = %options.config_path.display()))]
pub fn resolve_from_file(options: &BootstrapOptions) -> AppResult<ResolvedSettings> {
    let tree = load_settings_tree(&options.config_path)?;
    let settings = ObjectStoreSettings::from_value(&tree, options.resolver)
        .map_err(|err| AppError::config("settings.parse", err))?;
    info!(
        consolidated = settings.uses_consolidated_settings(),
        "object storage settings loaded"
    );
    settings
        .resolve()
        .map_err(|err| AppError::config("settings.resolve", err))
}

fn write_resolved(resolved: &ResolvedSettings, out: &mut impl Write) -> AppResult<()> {
    serde_json::to_writer_pretty(&mut *out, resolved)
        .map_err(|err| AppError::json("settings.render", err))?;
    writeln!(out).map_err(|source| AppError::Io {
        operation: "settings.render",
        path: None,
        source,
    })
}

/// Entry point for the Stowage startup harness.
///
/// # Errors
///
/// Returns an error if the environment is incomplete, logging cannot be
/// installed, or the settings fail to resolve.
pub fn run_app() -> AppResult<()> {
    let options = BootstrapOptions::from_env()?;
    stowage_telemetry::init_logging(&LoggingConfig {
        format: options.log_format,
        ..LoggingConfig::default()
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("Stowage settings bootstrap starting");
    let resolved = resolve_from_file(&options).inspect_err(|err| {
        error!(error = %err, "object storage settings rejected; aborting startup");
    })?;
    write_resolved(&resolved, &mut io::stdout().lock())
}

//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Use `FAULTLINE_CONFIG` as the config file path if it is set
//! 2. Otherwise probe the standard locations for a config file
//! 3. Fall back to [`Config::default`] when no file exists
//! 4. Apply `FAULTLINE_*` environment overrides on top
//! 5. Validate the result
//!
//! ## Environment Variables
//! - `FAULTLINE_CONFIG`: explicit config file path
//! - `FAULTLINE_BIND_ADDRESS`: listen address
//! - `FAULTLINE_ENABLE_FAULT_ROUTES`: mount `/faults/*` (true/false)
//! - `FAULTLINE_MAX_RETRIES`: retries after the first attempt
//! - `FAULTLINE_BACKOFF_BASE_MS`: first retry delay in milliseconds
//! - `FAULTLINE_MAX_BACKOFF_MS`: retry delay cap in milliseconds
//! - `FAULTLINE_FAILURE_THRESHOLD`: failed sequences before the breaker opens
//! - `FAULTLINE_BREAK_DURATION_MS`: how long the breaker stays open
//! - `FAULTLINE_METRICS_WINDOW_SECS`: sliding window length
//! - `FAULTLINE_PRUNE_INTERVAL_SECS`: pruning cadence
//! - `FAULTLINE_DOCS_BASE_URL`: documentation link prefix
//! - `FAULTLINE_INCLUDE_DIAGNOSTICS`: attach diagnostics (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./faultline.toml`, `./faultline.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use faultline_domain::{Config, FaultlineError, Result};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["faultline.toml", "faultline.json", "config.toml", "config.json"];

/// Load configuration: file (or defaults), then environment, then validation
///
/// # Errors
/// Returns `FaultlineError::Config` if:
/// - `FAULTLINE_CONFIG` names a missing or unreadable file
/// - A config file has an invalid format
/// - An override variable cannot be parsed
/// - The merged configuration fails validation
pub fn load() -> Result<Config> {
    let mut config = match std::env::var_os("FAULTLINE_CONFIG") {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::info!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Overrides are not applied and the result is not validated.
///
/// # Errors
/// Returns `FaultlineError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FaultlineError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FaultlineError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FaultlineError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FaultlineError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FaultlineError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FaultlineError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.is_file())
}

/// Apply `FAULTLINE_*` overrides to an existing configuration
///
/// Unset variables leave the corresponding field untouched.
///
/// # Errors
/// Returns `FaultlineError::Config` naming the variable that failed to parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(address) = env_string("FAULTLINE_BIND_ADDRESS") {
        config.server.bind_address = address;
    }
    if let Some(enabled) = env_bool("FAULTLINE_ENABLE_FAULT_ROUTES")? {
        config.server.enable_fault_routes = enabled;
    }

    if let Some(retries) = env_parse::<u32>("FAULTLINE_MAX_RETRIES")? {
        config.resilience.max_retries = retries;
    }
    if let Some(ms) = env_parse::<u64>("FAULTLINE_BACKOFF_BASE_MS")? {
        config.resilience.backoff_base = Duration::from_millis(ms);
    }
    if let Some(ms) = env_parse::<u64>("FAULTLINE_MAX_BACKOFF_MS")? {
        config.resilience.max_backoff = Duration::from_millis(ms);
    }
    if let Some(threshold) = env_parse::<u32>("FAULTLINE_FAILURE_THRESHOLD")? {
        config.resilience.failure_threshold = threshold;
    }
    if let Some(ms) = env_parse::<u64>("FAULTLINE_BREAK_DURATION_MS")? {
        config.resilience.break_duration = Duration::from_millis(ms);
    }

    if let Some(secs) = env_parse::<u64>("FAULTLINE_METRICS_WINDOW_SECS")? {
        config.metrics.window = Duration::from_secs(secs);
    }
    if let Some(secs) = env_parse::<u64>("FAULTLINE_PRUNE_INTERVAL_SECS")? {
        config.metrics.prune_interval = Duration::from_secs(secs);
    }
    if let Some(limit) = env_parse::<usize>("FAULTLINE_METRICS_MAX_LABELS")? {
        config.metrics.max_labels = limit;
    }

    if let Some(url) = env_string("FAULTLINE_DOCS_BASE_URL") {
        config.responses.documentation_base_url = url;
    }
    if let Some(enabled) = env_bool("FAULTLINE_INCLUDE_DIAGNOSTICS")? {
        config.responses.include_diagnostics = enabled;
    }

    Ok(())
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Parse a numeric environment variable
///
/// # Errors
/// Returns `FaultlineError::Config` if the variable is set but malformed.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| FaultlineError::Config(format!("Invalid {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Errors
/// Returns `FaultlineError::Config` if the variable is set to anything else.
fn env_bool(key: &str) -> Result<Option<bool>> {
    env_string(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(FaultlineError::Config(format!(
                "Invalid {}: expected a boolean, got '{}'",
                key, other
            ))),
        })
        .transpose()
}

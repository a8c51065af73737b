//! Configuration loading
//!
//! Reads a TOML or JSON config file when one exists and layers
//! `FAULTLINE_*` environment overrides on top.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_file, probe_config_paths};

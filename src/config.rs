//! Run configuration.
//!
//! Settings come from four layers, merged in a fixed order (later wins):
//!
//! ```text
//! stock defaults  <  config.toml  <  NORMPIC_* environment  <  CLI flags
//! ```
//!
//! Each layer is a sparse TOML table merged with [`merge_toml`]; the merged
//! table is deserialized once and validated.
//!
//! ## Config File
//!
//! ```toml
//! collection_name = "wedding"          # required; prefixes every filename
//! collection_description = "Summer"    # optional; copied into the manifest
//! source_dir = "/photos/raw"           # required; must be an existing directory
//! dest_dir = "/photos/wedding"         # required; created if missing
//! force_reprocess = false              # ignore the previous manifest
//! ```
//!
//! The file is taken from `--config`, else `NORMPIC_CONFIG_PATH`, else
//! `./config.toml`. Only the implicit `./config.toml` may be absent.
//!
//! ## Environment
//!
//! Only these variables are read; the environment is never enumerated:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `NORMPIC_SOURCE_DIR` | `source_dir` |
//! | `NORMPIC_DEST_DIR` | `dest_dir` |
//! | `NORMPIC_COLLECTION_NAME` | `collection_name` |
//! | `NORMPIC_CONFIG_PATH` | config file location |
//!
//! Unknown keys are rejected to catch typos early. Retired keys such as
//! `timestamp_offset_hours` are dropped from the file with a warning.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Keys older config files may carry that no longer do anything.
pub const RETIRED_KEYS: &[&str] = &["timestamp_offset_hours"];
pub const CONFIG_PATH_ENV: &str = "NORMPIC_CONFIG_PATH";

/// Whitelisted environment variables and the keys they set.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("NORMPIC_SOURCE_DIR", "source_dir"),
    ("NORMPIC_DEST_DIR", "dest_dir"),
    ("NORMPIC_COLLECTION_NAME", "collection_name"),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prefix for every generated filename.
    pub collection_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_description: Option<String>,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Reprocess every file even when the previous manifest says it is unchanged.
    pub force_reprocess: bool,
}

impl Config {
    /// Check required values are present and usable in filenames.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "collection_name must not be empty".into(),
            ));
        }
        if self.collection_name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "collection_name must not contain path separators".into(),
            ));
        }
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("source_dir must be set".into()));
        }
        if self.dest_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("dest_dir must be set".into()));
        }
        if self.source_dir == self.dest_dir {
            return Err(ConfigError::Validation(
                "source_dir and dest_dir must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn check_source(&self) -> Result<(), ConfigError> {
        if !self.source_dir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "source_dir is not a directory: {}",
                self.source_dir.display()
            )));
        }
        Ok(())
    }

    /// Check the source directory exists and create the destination.
    pub fn prepare_paths(&self) -> Result<(), ConfigError> {
        self.check_source()?;
        fs::create_dir_all(&self.dest_dir)?;
        Ok(())
    }

    /// JSON snapshot recorded in the manifest.
    pub fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Values given on the command line. `None`/`false` leave lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub collection_name: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub force_reprocess: bool,
}

impl CliOverrides {
    pub fn to_toml(&self) -> toml::Value {
        let mut table = toml::Table::new();
        if let Some(name) = &self.collection_name {
            table.insert("collection_name".into(), name.clone().into());
        }
        if let Some(dir) = &self.source_dir {
            table.insert("source_dir".into(), path_value(dir));
        }
        if let Some(dir) = &self.dest_dir {
            table.insert("dest_dir".into(), path_value(dir));
        }
        if self.force_reprocess {
            table.insert("force_reprocess".into(), true.into());
        }
        toml::Value::Table(table)
    }
}

fn path_value(path: &Path) -> toml::Value {
    toml::Value::String(path.to_string_lossy().into_owned())
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML table.
///
/// Base layer for every merge. Optional settings without a default are absent.
pub fn stock_defaults_value() -> toml::Value {
    let defaults = Config::default();
    let mut table = toml::Table::new();
    table.insert("collection_name".into(), defaults.collection_name.into());
    table.insert("source_dir".into(), path_value(&defaults.source_dir));
    table.insert("dest_dir".into(), path_value(&defaults.dest_dir));
    table.insert("force_reprocess".into(), defaults.force_reprocess.into());
    toml::Value::Table(table)
}

/// Layer `overlay` over `base`. Tables merge per key, recursively; any other
/// overlay value replaces the base value outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let mut value: toml::Value = toml::from_str(&content)?;
    if let Some(table) = value.as_table_mut() {
        for key in RETIRED_KEYS {
            if table.remove(*key).is_some() {
                tracing::warn!(path = %path.display(), key = *key, "ignoring retired config key");
            }
        }
    }
    Ok(Some(value))
}

/// Build the environment layer from the whitelisted variables.
///
/// `lookup` is `std::env::var(..).ok()` in the binary; tests pass a map.
/// Empty values are ignored.
pub fn env_overlay(lookup: impl Fn(&str) -> Option<String>) -> toml::Value {
    let mut table = toml::Table::new();
    for (var, key) in ENV_OVERRIDES {
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            table.insert((*key).into(), toml::Value::String(value));
        }
    }
    toml::Value::Table(table)
}

/// Where the config file comes from, and whether it was asked for explicitly.
pub fn config_file_location(
    cli_path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> (PathBuf, bool) {
    if let Some(path) = cli_path {
        return (path.to_path_buf(), true);
    }
    match lookup(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the fully layered configuration.
pub fn load_config(
    cli_path: Option<&Path>,
    cli: &CliOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let (path, explicit) = config_file_location(cli_path, &lookup);
    let file_layer = match load_raw_config(&path)? {
        Some(value) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(value)
        }
        None if explicit => return Err(ConfigError::NotFound(path)),
        None => None,
    };

    let mut merged = stock_defaults_value();
    if let Some(file_layer) = file_layer {
        merged = merge_toml(merged, file_layer);
    }
    merged = merge_toml(merged, env_overlay(&lookup));
    resolve_config(merged, Some(cli.to_toml()))
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# NormPic Configuration
# =====================
# Settings can also come from NORMPIC_SOURCE_DIR, NORMPIC_DEST_DIR and
# NORMPIC_COLLECTION_NAME, or from command-line flags. Later layers win:
#   defaults < this file < environment < command line
#
# Unknown keys will cause an error.

# Collection name. Required. Becomes the prefix of every generated filename:
#   wedding-20241005T143045-r5a.jpg
collection_name = ""

# Optional free-text description copied into the manifest.
# collection_description = ""

# Directory holding the original photos. Required. Only files directly
# inside it are considered; subdirectories are ignored.
source_dir = ""

# Directory receiving the generated symlinks and manifest.json. Required.
# Created if it does not exist.
dest_dir = ""

# Reprocess every photo, ignoring the previous manifest.
force_reprocess = false
"##
}

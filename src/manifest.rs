//! The manifest: one JSON document per destination directory describing every
//! generated link and where it came from.
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "collection_name": "wedding",
//!   "generated_at": "2024-10-05T16:00:00",
//!   "pics": [
//!     {
//!       "source_path": "/photos/IMG_0001.jpg",
//!       "dest_path": "wedding-20241005T143045-r5a.jpg",
//!       "hash": "sha256-…",
//!       "size_bytes": 2481152,
//!       "mtime": 1728138645.0,
//!       "timestamp": "2024-10-05T14:30:45",
//!       "timestamp_source": "exif",
//!       "camera": "Canon EOS R5",
//!       "gps": null,
//!       "errors": []
//!     }
//!   ],
//!   "config": { … },
//!   "errors": [],
//!   "warnings": [],
//!   "processing_status": { "status": "completed", … }
//! }
//! ```
//!
//! Decoding is two-step: the raw JSON is checked by [`validate_value`] first,
//! then converted to typed structs. Timestamps are written as second-precision
//! ISO-8601 without an offset; an offset or `Z` in input is accepted and
//! dropped.

use crate::fsops::FileSystem;
use crate::issues::{Issue, ProcessingSummary, RunStatus};
use crate::schema::validate_value;
use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const MANIFEST_VERSION: &str = "0.1.0";
pub const MANIFEST_FILENAME: &str = "manifest.json";
pub const DRY_RUN_MANIFEST_FILENAME: &str = "manifest.dryrun.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Manifest decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Manifest validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub collection_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_description: Option<String>,
    #[serde(with = "iso_seconds")]
    pub generated_at: NaiveDateTime,
    pub pics: Vec<Pic>,
    /// Snapshot of the configuration that produced this manifest.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<Issue>,
    #[serde(default)]
    pub warnings: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<ProcessingStatus>,
}

impl Manifest {
    pub fn new(collection_name: impl Into<String>, generated_at: NaiveDateTime) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            collection_name: collection_name.into(),
            collection_description: None,
            generated_at: truncate_to_seconds(generated_at),
            pics: Vec::new(),
            config: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            processing_status: None,
        }
    }

    pub fn dest_names(&self) -> HashSet<&str> {
        self.pics.iter().map(|p| p.dest_path.as_str()).collect()
    }

    pub fn find_by_source(&self, source_path: &str) -> Option<&Pic> {
        self.locate_source(source_path).map(|(_, pic)| pic)
    }

    /// The record for `source_path` and its index in `pics`.
    pub fn locate_source(&self, source_path: &str) -> Option<(usize, &Pic)> {
        self.pics
            .iter()
            .enumerate()
            .find(|(_, p)| p.source_path == source_path)
    }
}

/// One generated link and its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pic {
    pub source_path: String,
    /// Generated filename, relative to the destination directory.
    pub dest_path: String,
    pub hash: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub mtime: Option<f64>,
    #[serde(default, with = "iso_seconds_opt")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub timestamp_source: Option<TimestampSource>,
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub gps: Option<Gps>,
    #[serde(default)]
    pub errors: Vec<Issue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    Exif,
    Filename,
    Filesystem,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub status: RunStatus,
    pub total_files: usize,
    pub processed_successfully: usize,
    #[serde(default)]
    pub warnings_count: usize,
    #[serde(default)]
    pub errors_count: usize,
    #[serde(default)]
    pub files_skipped: usize,
}

impl From<&ProcessingSummary> for ProcessingStatus {
    fn from(summary: &ProcessingSummary) -> Self {
        Self {
            status: summary.status,
            total_files: summary.total_files,
            processed_successfully: summary.processed_successfully,
            warnings_count: summary.warnings_count,
            errors_count: summary.errors_count,
            files_skipped: summary.files_skipped,
        }
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Parse an ISO-8601 timestamp, dropping any offset and sub-second part.
pub fn parse_iso_timestamp(value: &str) -> Option<NaiveDateTime> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;
    Some(truncate_to_seconds(parsed))
}

pub fn format_iso_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

/// Current local wall-clock time at whole-second precision.
pub fn now_seconds() -> NaiveDateTime {
    truncate_to_seconds(Local::now().naive_local())
}

mod iso_seconds {
    use super::{format_iso_timestamp, parse_iso_timestamp};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_iso_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_iso_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'")))
    }
}

mod iso_seconds_opt {
    use super::{format_iso_timestamp, parse_iso_timestamp};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_str(&format_iso_timestamp(v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => parse_iso_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'"))),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Render a manifest as 2-space indented JSON, optionally checking it first.
pub fn serialize(manifest: &Manifest, validate: bool) -> Result<String, ManifestError> {
    if validate {
        let problems = validate_value(&serde_json::to_value(manifest)?);
        if !problems.is_empty() {
            return Err(ManifestError::Validation(problems));
        }
    }
    Ok(serde_json::to_string_pretty(manifest)?)
}

pub fn deserialize(text: &str) -> Result<Manifest, ManifestError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let problems = validate_value(&value);
    if !problems.is_empty() {
        return Err(ManifestError::Validation(problems));
    }
    Ok(serde_json::from_value(value)?)
}

/// Load a previous manifest.
///
/// Anything short of a valid manifest (missing file, bad JSON, schema
/// violation) yields `None`, so the run proceeds as if it were the first.
pub fn load_manifest(path: &Path) -> Option<Manifest> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no previous manifest");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read previous manifest");
            return None;
        }
    };
    match deserialize(&text) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid previous manifest");
            None
        }
    }
}

/// Validate and atomically write a manifest.
pub fn save_manifest(
    fs: &impl FileSystem,
    path: &Path,
    manifest: &Manifest,
) -> Result<(), ManifestError> {
    let text = serialize(manifest, true)?;
    fs.write_atomic(path, text.as_bytes())?;
    tracing::debug!(path = %path.display(), pics = manifest.pics.len(), "manifest written");
    Ok(())
}

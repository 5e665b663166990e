//! Photo types shared by extraction, ordering, and naming.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Best-effort metadata pulled from a photo.
///
/// Every field is optional: a file with no readable EXIF yields
/// `PhotoMetadata::default()`. `timestamp` carries whole seconds only; the
/// sub-second part lives in `subsecond` as milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    pub timestamp: Option<NaiveDateTime>,
    pub subsecond: Option<u32>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
}

impl PhotoMetadata {
    pub fn camera(&self) -> CameraInfo<'_> {
        CameraInfo {
            make: non_blank(self.camera_make.as_deref()),
            model: non_blank(self.camera_model.as_deref()),
        }
    }

    /// Latitude/longitude pair, only when both halves were read.
    pub fn gps(&self) -> Option<(f64, f64)> {
        Some((self.gps_lat?, self.gps_lon?))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Borrowed view of a photo's camera make and model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraInfo<'a> {
    pub make: Option<&'a str>,
    pub model: Option<&'a str>,
}

impl CameraInfo<'_> {
    /// Burst identity: `"{make}-{model}"` with `unknown` for a missing half.
    pub fn key(&self) -> String {
        format!(
            "{}-{}",
            self.make.unwrap_or("unknown"),
            self.model.unwrap_or("unknown")
        )
    }

    /// Human-readable label recorded in the manifest, e.g. `"Canon EOS R5"`.
    /// The make is dropped when the model already starts with it.
    pub fn label(&self) -> Option<String> {
        match (self.make, self.model) {
            (Some(make), Some(model)) if starts_with_ignore_case(model, make) => {
                Some(model.to_string())
            }
            (Some(make), Some(model)) => Some(format!("{make} {model}")),
            (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
            (None, None) => None,
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// A source file paired with its extracted metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoEntry {
    pub path: PathBuf,
    pub metadata: PhotoMetadata,
}

impl PhotoEntry {
    pub fn new(path: impl Into<PathBuf>, metadata: PhotoMetadata) -> Self {
        Self {
            path: path.into(),
            metadata,
        }
    }

    /// Final path component, or the whole path when there is none.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

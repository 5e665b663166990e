//! Photo metadata extraction.
//!
//! The pipeline talks to extraction through the [`MetadataExtractor`] trait so
//! tests can substitute canned metadata. The production implementation,
//! [`ExifExtractor`], reads EXIF with `kamadak-exif`.
//!
//! ## Fields read
//!
//! | Field | EXIF tag | Notes |
//! |-------|----------|-------|
//! | timestamp | `DateTimeOriginal` | `YYYY:MM:DD HH:MM:SS`, whole seconds |
//! | subsecond | `SubSecTimeOriginal` | digit string scaled to milliseconds (`"45"` → 450) |
//! | camera_make | `Make` | trimmed |
//! | camera_model | `Model` | trimmed |
//! | gps_lat / gps_lon | `GPSLatitude(Ref)` / `GPSLongitude(Ref)` | degrees/minutes/seconds → signed decimal |
//!
//! Extraction never fails. Whatever could be read is returned, and the reason
//! for anything missing travels alongside as an [`ExtractProblem`].

use crate::types::PhotoMetadata;
use chrono::NaiveDateTime;
use exif::{In, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extensions treated as photos (compared lowercased).
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "webp"];

pub fn is_photo_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PHOTO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Why metadata could not be (fully) read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractProblem {
    /// The file could not be opened or read.
    Unreadable(String),
    /// The file is readable but carries no usable EXIF block.
    Missing(String),
    /// The container or EXIF block is malformed.
    Corrupted(String),
}

/// Outcome of one extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub metadata: PhotoMetadata,
    pub problem: Option<ExtractProblem>,
}

impl Extraction {
    pub fn found(metadata: PhotoMetadata) -> Self {
        Self {
            metadata,
            problem: None,
        }
    }

    pub fn failed(problem: ExtractProblem) -> Self {
        Self {
            metadata: PhotoMetadata::default(),
            problem: Some(problem),
        }
    }
}

/// Source of per-file photo metadata.
pub trait MetadataExtractor {
    /// Best-effort read of `path`. Never fails.
    fn extract(&self, path: &Path) -> Extraction;
}

/// EXIF-backed extractor for JPEG, PNG, HEIF and WebP containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, path: &Path) -> Extraction {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => return Extraction::failed(ExtractProblem::Unreadable(e.to_string())),
        };
        let mut reader = BufReader::new(file);
        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Extraction::found(metadata_from_exif(&exif)),
            Err(err) => Extraction::failed(classify(&err)),
        }
    }
}

fn classify(err: &exif::Error) -> ExtractProblem {
    match err {
        exif::Error::Io(e) => ExtractProblem::Unreadable(e.to_string()),
        exif::Error::NotFound(_) | exif::Error::BlankValue(_) | exif::Error::NotSupported(_) => {
            ExtractProblem::Missing(err.to_string())
        }
        _ => ExtractProblem::Corrupted(err.to_string()),
    }
}

fn metadata_from_exif(exif: &exif::Exif) -> PhotoMetadata {
    let ascii = |tag: Tag| exif.get_field(tag, In::PRIMARY).and_then(ascii_value);

    PhotoMetadata {
        timestamp: ascii(Tag::DateTimeOriginal)
            .as_deref()
            .and_then(parse_exif_datetime),
        subsecond: ascii(Tag::SubSecTimeOriginal)
            .as_deref()
            .and_then(parse_subsec_millis),
        camera_make: ascii(Tag::Make),
        camera_model: ascii(Tag::Model),
        gps_lat: gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S', 90.0),
        gps_lon: gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W', 180.0),
    }
}

fn ascii_value(field: &exif::Field) -> Option<String> {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .first()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn gps_coordinate(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_ref: char,
    limit: f64,
) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let (d, m, s) = match &field.value {
        exif::Value::Rational(v) if v.len() >= 3 => (v[0].to_f64(), v[1].to_f64(), v[2].to_f64()),
        _ => return None,
    };
    let negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(ascii_value)
        .map(|r| r.contains(negative_ref))
        .unwrap_or(false);
    let degrees = dms_to_degrees(d, m, s, negative);
    (degrees.is_finite() && degrees.abs() <= limit).then_some(degrees)
}

/// Parse an EXIF `DateTimeOriginal` value (`2024:10:05 14:30:45`).
pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y:%m:%d %H:%M:%S").ok()
}

/// Scale an EXIF sub-second digit string to milliseconds.
///
/// The string is a decimal fraction of a second, so only its first three
/// digits matter: `"5"` → 500, `"45"` → 450, `"123456"` → 123.
pub fn parse_subsec_millis(value: &str) -> Option<u32> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut millis: String = digits.chars().take(3).collect();
    while millis.len() < 3 {
        millis.push('0');
    }
    millis.parse().ok()
}

pub fn dms_to_degrees(degrees: f64, minutes: f64, seconds: f64, negative: bool) -> f64 {
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    if negative { -value } else { value }
}

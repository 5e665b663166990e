//! Output filename generation.
//!
//! Every photo gets a name of the form
//!
//! ```text
//! {collection}-{YYYYMMDDTHHMMSS}-{camera}{-counter}{ext}
//! wedding-20241005T143045-r5a.jpg
//! wedding-20241005T143045-r5a-0.jpg
//! ```
//!
//! The collection prefix is dropped when the collection is empty. The camera
//! code is three lowercase characters. When a base name is already taken in
//! the batch, a single-character counter from `0-9A-V` is appended, giving 32
//! extra slots per base name.

use crate::types::{CameraInfo, PhotoMetadata};
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use thiserror::Error;

/// Counter alphabet for collision suffixes.
pub const COUNTER_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";

/// Known camera models, matched in order against `"make model"` (lowercased).
const CAMERA_CODES: &[(&str, &str)] = &[
    ("canon eos r5", "r5a"),
    ("canon eos r6", "r6a"),
    ("canon eos 5d", "5da"),
    ("canon eos 6d", "6da"),
    ("nikon d850", "d85"),
    ("nikon d750", "d75"),
    ("sony a7r", "a7r"),
    ("sony a7 iii", "a73"),
    ("iphone 15", "i15"),
    ("iphone 14", "i14"),
    ("iphone 13", "i13"),
    ("iphone 12", "i12"),
    ("iphone", "iph"),
];

const UNKNOWN_CAMERA: &str = "unk";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("no free counter left for '{base}{extension}' (all {} suffixes taken)", COUNTER_ALPHABET.len())]
    Exhausted { base: String, extension: String },
}

/// Three-character camera code for filenames.
pub fn camera_code(camera: &CameraInfo) -> String {
    let combined = match (camera.make, camera.model) {
        (None, None) => return UNKNOWN_CAMERA.to_string(),
        (make, model) => format!("{} {}", make.unwrap_or(""), model.unwrap_or(""))
            .trim()
            .to_lowercase(),
    };

    if let Some((_, code)) = CAMERA_CODES
        .iter()
        .find(|(pattern, _)| combined.contains(pattern))
    {
        return code.to_string();
    }

    let mut code: String = combined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect();
    if code.is_empty() {
        return UNKNOWN_CAMERA.to_string();
    }
    while code.len() < 3 {
        code.push('x');
    }
    code
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y%m%dT%H%M%S").to_string()
}

/// Name without counter or extension.
///
/// `now` stands in for photos that carry no timestamp.
pub fn base_name(metadata: &PhotoMetadata, collection: &str, now: NaiveDateTime) -> String {
    let timestamp = format_timestamp(&metadata.timestamp.unwrap_or(now));
    let code = camera_code(&metadata.camera());
    if collection.is_empty() {
        format!("{timestamp}-{code}")
    } else {
        format!("{collection}-{timestamp}-{code}")
    }
}

/// Lowest counter character whose suffixed name is not yet taken.
pub fn find_available_counter(
    base: &str,
    extension: &str,
    existing_names: &HashSet<String>,
) -> Option<char> {
    COUNTER_ALPHABET
        .iter()
        .map(|&b| b as char)
        .find(|c| !existing_names.contains(&format!("{base}-{c}{extension}")))
}

/// Generate a collision-free filename, using the local wall clock for photos
/// without a timestamp.
///
/// `extension` includes its leading dot. The caller adds the returned name to
/// `existing_names` before naming the next photo in the batch.
pub fn generate_filename(
    metadata: &PhotoMetadata,
    collection: &str,
    extension: &str,
    existing_names: &HashSet<String>,
) -> Result<String, NamingError> {
    generate_filename_at(
        metadata,
        collection,
        extension,
        existing_names,
        Local::now().naive_local(),
    )
}

/// [`generate_filename`] with an explicit fallback clock.
pub fn generate_filename_at(
    metadata: &PhotoMetadata,
    collection: &str,
    extension: &str,
    existing_names: &HashSet<String>,
    now: NaiveDateTime,
) -> Result<String, NamingError> {
    let base = base_name(metadata, collection, now);
    let plain = format!("{base}{extension}");
    if !existing_names.contains(&plain) {
        return Ok(plain);
    }
    match find_available_counter(&base, extension, existing_names) {
        Some(counter) => Ok(format!("{base}-{counter}{extension}")),
        None => Err(NamingError::Exhausted {
            base,
            extension: extension.to_string(),
        }),
    }
}

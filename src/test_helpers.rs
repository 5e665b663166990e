//! Shared builders for unit tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let entry = named("a.jpg", meta_at(at("2024-10-05 14:30:45"), Some(120), "Canon", "EOS R5"));
//! let extractor = FakeExtractor::default().with("a.jpg", entry.metadata.clone());
//! ```

use crate::manifest::{Pic, TimestampSource};
use crate::metadata::{ExtractProblem, Extraction, MetadataExtractor};
use crate::types::{PhotoEntry, PhotoMetadata, file_name_of};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

// =========================================================================
// Metadata
// =========================================================================

/// Parse `YYYY-MM-DD HH:MM:SS`.
pub fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Metadata with a timestamp and camera. Empty make/model strings mean absent.
pub fn meta_at(
    timestamp: NaiveDateTime,
    subsecond: Option<u32>,
    make: &str,
    model: &str,
) -> PhotoMetadata {
    let present = |s: &str| (!s.is_empty()).then(|| s.to_string());
    PhotoMetadata {
        timestamp: Some(timestamp),
        subsecond,
        camera_make: present(make),
        camera_model: present(model),
        ..Default::default()
    }
}

pub fn named(name: &str, metadata: PhotoMetadata) -> PhotoEntry {
    PhotoEntry::new(format!("/src/{name}"), metadata)
}

pub fn sample_pic(source_name: &str, dest_name: &str) -> Pic {
    Pic {
        source_path: format!("/photos/{source_name}"),
        dest_path: dest_name.to_string(),
        hash: "sha256-3a6eb0790f39ac87c94f3856b2dd2c5d110e6811602261a9a923d3bb23adc8b7".into(),
        size_bytes: 1024,
        mtime: Some(1728138645.5),
        timestamp: Some(at("2024-10-05 14:30:45")),
        timestamp_source: Some(TimestampSource::Exif),
        camera: Some("Canon EOS R5".into()),
        gps: None,
        errors: Vec::new(),
    }
}

// =========================================================================
// Filesystem
// =========================================================================

pub fn set_mtime(path: &Path, seconds: f64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs_f64(seconds))
        .unwrap();
}

/// Extractor answering from a table keyed by file name.
///
/// Files not in the table report missing EXIF.
#[derive(Debug, Default)]
pub struct FakeExtractor {
    results: HashMap<String, Extraction>,
}

impl FakeExtractor {
    pub fn with(mut self, name: &str, metadata: PhotoMetadata) -> Self {
        self.results
            .insert(name.to_string(), Extraction::found(metadata));
        self
    }

    pub fn with_problem(mut self, name: &str, problem: ExtractProblem) -> Self {
        self.results
            .insert(name.to_string(), Extraction::failed(problem));
        self
    }
}

impl MetadataExtractor for FakeExtractor {
    fn extract(&self, path: &Path) -> Extraction {
        self.results
            .get(&file_name_of(path))
            .cloned()
            .unwrap_or_else(|| Extraction::failed(ExtractProblem::Missing("no EXIF".into())))
    }
}

// =========================================================================
// EXIF-bearing JPEG bytes
// =========================================================================

/// Minimal JPEG whose APP1 segment carries a little-endian TIFF block with
/// Make, Model, DateTimeOriginal and optionally SubSecTimeOriginal.
pub fn jpeg_with_exif(
    make: &str,
    model: &str,
    datetime_original: &str,
    subsec: Option<&str>,
) -> Vec<u8> {
    let tiff = tiff_block(make, model, datetime_original, subsec);
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

struct IfdEntry {
    tag: u16,
    kind: u16,
    count: u32,
    bytes: Vec<u8>,
}

fn ascii(tag: u16, value: &str) -> IfdEntry {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    IfdEntry {
        tag,
        kind: 2,
        count: bytes.len() as u32,
        bytes,
    }
}

fn long(tag: u16, value: u32) -> IfdEntry {
    IfdEntry {
        tag,
        kind: 4,
        count: 1,
        bytes: value.to_le_bytes().to_vec(),
    }
}

fn ifd_size(entries: usize) -> usize {
    2 + 12 * entries + 4
}

fn tiff_block(make: &str, model: &str, datetime_original: &str, subsec: Option<&str>) -> Vec<u8> {
    let mut exif_ifd = vec![ascii(0x9003, datetime_original)];
    if let Some(subsec) = subsec {
        exif_ifd.push(ascii(0x9291, subsec));
    }
    let exif_offset = 8 + ifd_size(3);
    let ifd0 = [
        ascii(0x010F, make),
        ascii(0x0110, model),
        long(0x8769, exif_offset as u32),
    ];
    let data_start = exif_offset + ifd_size(exif_ifd.len());

    let mut out = b"II\x2A\x00\x08\x00\x00\x00".to_vec();
    let mut data = Vec::new();
    write_ifd(&mut out, &ifd0, data_start, &mut data);
    write_ifd(&mut out, &exif_ifd, data_start, &mut data);
    out.extend_from_slice(&data);
    out
}

fn write_ifd(out: &mut Vec<u8>, entries: &[IfdEntry], data_start: usize, data: &mut Vec<u8>) {
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.kind.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.bytes.len() <= 4 {
            let mut inline = entry.bytes.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&((data_start + data.len()) as u32).to_le_bytes());
            data.extend_from_slice(&entry.bytes);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
}

//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A source directory with EXIF-bearing JPEGs and an empty destination.
pub struct Workspace {
    pub tmp: TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("raw");
        let dest = tmp.path().join("organized");
        fs::create_dir(&source).unwrap();
        Self { tmp, source, dest }
    }

    /// Write `name` as a JPEG shot by `model` at `datetime` (`YYYY:MM:DD HH:MM:SS`).
    pub fn photo(&self, name: &str, make: &str, model: &str, datetime: &str) -> PathBuf {
        let path = self.source.join(name);
        fs::write(&path, jpeg_with_exif(make, model, datetime, None)).unwrap();
        path
    }

    pub fn file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.source.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn dest_entries(&self) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(&self.dest)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn link_target(&self, name: &str) -> PathBuf {
        fs::read_link(self.dest.join(name)).unwrap()
    }

    pub fn manifest_json(&self, name: &str) -> serde_json::Value {
        let text = fs::read_to_string(self.dest.join(name)).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

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

//! End-to-end runs of the library pipeline on real JPEG files.
//!
//! Photos are generated on the fly with a minimal EXIF block so the real
//! extractor, hashing and symlink code all run.

#![cfg(unix)]

mod common;

use common::{Workspace, canonical};
use normpic::config::Config;
use normpic::incremental::ReuseStats;
use normpic::issues::{IssueKind, RunStatus};
use normpic::manifest::{TimestampSource, load_manifest};
use normpic::organize::{RunOptions, organize};
use std::fs;
use std::time::Duration;

fn config_for(ws: &Workspace, collection: &str) -> Config {
    Config {
        collection_name: collection.into(),
        source_dir: ws.source.clone(),
        dest_dir: ws.dest.clone(),
        ..Default::default()
    }
}

fn shoot(ws: &Workspace) {
    ws.photo("IMG_0002.jpg", "Canon", "Canon EOS R5", "2024:10:05 14:30:46");
    ws.photo("IMG_0001.jpg", "Canon", "Canon EOS R5", "2024:10:05 14:30:45");
    ws.photo("phone.jpg", "Apple", "iPhone 15", "2024:10:05 14:30:50");
}

#[test]
fn first_run_orders_names_and_links() {
    let ws = Workspace::new();
    shoot(&ws);
    let report = organize(&config_for(&ws, "wedding"), &RunOptions::default(), None).unwrap();

    assert_eq!(report.summary.status, RunStatus::Completed);
    assert_eq!(
        ws.dest_entries(),
        [
            "manifest.json",
            "wedding-20241005T143045-r5a.jpg",
            "wedding-20241005T143046-r5a.jpg",
            "wedding-20241005T143050-i15.jpg",
        ]
    );
    assert_eq!(
        ws.link_target("wedding-20241005T143045-r5a.jpg"),
        canonical(&ws.source.join("IMG_0001.jpg"))
    );
    assert_eq!(
        ws.link_target("wedding-20241005T143050-i15.jpg"),
        canonical(&ws.source.join("phone.jpg"))
    );

    let pic = &report.manifest.pics[0];
    assert_eq!(pic.camera.as_deref(), Some("Canon EOS R5"));
    assert_eq!(pic.timestamp_source, Some(TimestampSource::Exif));
    assert!(pic.hash.starts_with("sha256-"));
}

#[test]
fn manifest_json_shape() {
    let ws = Workspace::new();
    shoot(&ws);
    organize(&config_for(&ws, "wedding"), &RunOptions::default(), None).unwrap();

    let json = ws.manifest_json("manifest.json");
    assert_eq!(json["version"], "0.1.0");
    assert_eq!(json["collection_name"], "wedding");
    assert_eq!(json["pics"].as_array().unwrap().len(), 3);
    assert_eq!(json["pics"][0]["timestamp"], "2024-10-05T14:30:45");
    assert_eq!(json["pics"][0]["timestamp_source"], "exif");
    assert!(json["pics"][0]["gps"].is_null());
    assert_eq!(json["config"]["collection_name"], "wedding");
    assert_eq!(json["processing_status"]["status"], "completed");
    assert_eq!(json["processing_status"]["total_files"], 3);
}

#[test]
fn rerun_reuses_everything() {
    let ws = Workspace::new();
    shoot(&ws);
    let config = config_for(&ws, "wedding");
    let first = organize(&config, &RunOptions::default(), None).unwrap();
    let entries = ws.dest_entries();

    let second = organize(&config, &RunOptions::default(), None).unwrap();
    assert_eq!(second.stats, ReuseStats { reused: 3, processed: 0 });
    assert_eq!(second.manifest.pics, first.manifest.pics);
    assert_eq!(ws.dest_entries(), entries);
}

#[test]
fn rerun_keeps_time_order_when_names_disagree() {
    let ws = Workspace::new();
    ws.photo("a_last.jpg", "Canon", "Canon EOS R5", "2024:10:05 14:30:47");
    ws.photo("b_first.jpg", "Canon", "Canon EOS R5", "2024:10:05 14:30:45");
    ws.photo("c_middle.jpg", "Canon", "Canon EOS R5", "2024:10:05 14:30:46");
    let config = config_for(&ws, "wedding");
    let first = organize(&config, &RunOptions::default(), None).unwrap();

    ws.photo("0_new.jpg", "Apple", "iPhone 15", "2024:10:05 14:30:50");
    let second = organize(&config, &RunOptions::default(), None).unwrap();
    assert_eq!(second.stats, ReuseStats { reused: 3, processed: 1 });
    assert_eq!(second.manifest.pics[..3], first.manifest.pics[..]);

    let names: Vec<_> = second.manifest.pics.iter().map(|p| p.dest_path.as_str()).collect();
    assert_eq!(
        names,
        [
            "wedding-20241005T143045-r5a.jpg",
            "wedding-20241005T143046-r5a.jpg",
            "wedding-20241005T143047-r5a.jpg",
            "wedding-20241005T143050-i15.jpg",
        ]
    );

    let on_disk = load_manifest(&ws.dest.join("manifest.json")).unwrap();
    assert_eq!(on_disk.pics, second.manifest.pics);
}

#[test]
fn edited_photo_keeps_its_slot() {
    let ws = Workspace::new();
    shoot(&ws);
    let config = config_for(&ws, "wedding");
    let first = organize(&config, &RunOptions::default(), None).unwrap();

    // Rewrite with the same EXIF but different bytes
    let path = ws.source.join("IMG_0002.jpg");
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(b"edited");
    fs::write(&path, bytes).unwrap();
    let modified = fs::metadata(&path).unwrap().modified().unwrap();
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(modified + Duration::from_secs(60)).unwrap();

    let second = organize(&config, &RunOptions::default(), None).unwrap();
    assert_eq!(second.stats, ReuseStats { reused: 2, processed: 1 });
    assert_eq!(second.manifest.pics[1].dest_path, first.manifest.pics[1].dest_path);
    assert_ne!(second.manifest.pics[1].hash, first.manifest.pics[1].hash);
}

#[test]
fn removed_photo_loses_its_link() {
    let ws = Workspace::new();
    shoot(&ws);
    let config = config_for(&ws, "wedding");
    organize(&config, &RunOptions::default(), None).unwrap();

    fs::remove_file(ws.source.join("phone.jpg")).unwrap();
    let second = organize(&config, &RunOptions::default(), None).unwrap();

    assert_eq!(second.manifest.pics.len(), 2);
    assert!(!ws.dest_entries().contains(&"wedding-20241005T143050-i15.jpg".to_string()));
}

#[test]
fn files_without_exif_and_other_formats() {
    let ws = Workspace::new();
    ws.photo("IMG_0001.jpg", "Canon", "Canon EOS R5", "2024:10:05 14:30:45");
    ws.file("bare.jpg", &[0xFF, 0xD8, 0xFF, 0xD9]);
    ws.file("notes.txt", b"shot list");
    ws.file(".hidden.jpg", b"ignored");

    let report = organize(&config_for(&ws, "c"), &RunOptions::default(), None).unwrap();

    assert_eq!(report.summary.status, RunStatus::CompletedWithWarnings);
    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.manifest.pics.len(), 2);
    assert_eq!(report.manifest.warnings.len(), 1);
    assert_eq!(report.manifest.warnings[0].error_type, IssueKind::UnsupportedFormat);

    let bare = report
        .manifest
        .pics
        .iter()
        .find(|p| p.source_path.ends_with("bare.jpg"))
        .unwrap();
    assert_eq!(bare.timestamp, None);
    assert!(bare.dest_path.ends_with("-unk.jpg"));
    assert_eq!(bare.errors[0].error_type, IssueKind::ExifError);
}

#[test]
fn dry_run_touches_nothing_but_its_manifest() {
    let ws = Workspace::new();
    shoot(&ws);
    let options = RunOptions { dry_run: true };
    let report = organize(&config_for(&ws, "wedding"), &options, None).unwrap();

    assert_eq!(ws.dest_entries(), ["manifest.dryrun.json"]);
    assert_eq!(report.manifest.pics.len(), 3);
    assert!(load_manifest(&ws.dest.join("manifest.dryrun.json")).is_some());
}

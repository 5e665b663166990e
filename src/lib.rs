//! # NormPic
//!
//! Deterministic ordering, naming and manifest generation for photo
//! collections. Photos in a flat source directory are ordered by capture time,
//! given collision-free names, and exposed in a destination directory as
//! symlinks. A JSON manifest beside the links records where every name came
//! from, and drives incremental re-runs.
//!
//! # Architecture: One Pipeline, One Manifest
//!
//! ```text
//! source/  →  extract  →  order  →  name  →  dest/ (symlinks + manifest.json)
//!                 ↑                              │
//!                 └──── previous manifest ───────┘
//! ```
//!
//! Each run reads the previous `manifest.json`, carries over the records of
//! files that did not change, and sends the rest through extraction, ordering
//! and naming. The manifest is both the output and the cache.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`organize`] | The pipeline: reuse check, extraction, ordering, naming, linking, manifest write |
//! | [`types`] | Photo metadata and entries shared by every stage |
//! | [`metadata`] | `MetadataExtractor` trait and the EXIF implementation |
//! | [`ordering`] | Temporal sort and burst regrouping |
//! | [`naming`] | `{collection}-{timestamp}-{camera}` filenames with collision counters |
//! | [`issues`] | Per-file problem taxonomy, severities, and run status |
//! | [`manifest`] | Manifest types, JSON round trip, atomic save |
//! | [`schema`] | Structural validation of raw manifest JSON |
//! | [`incremental`] | Change detection and the reused/new merge |
//! | [`fsops`] | `FileSystem` trait and the local implementation |
//! | [`config`] | Layered configuration: defaults, `config.toml`, environment, CLI |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Names Are Stable
//!
//! A name, once handed out, stays with its photo for as long as the photo is
//! unchanged and the collection name stays the same. New photos are named
//! around the names already in use rather than renumbering the batch, so
//! links shared elsewhere keep working across runs.
//!
//! ## Symlinks, Not Copies
//!
//! The destination holds symlinks to absolute source paths. Organizing a
//! collection costs no disk space, and the source directory stays the single
//! copy of every file.
//!
//! ## Problems Are Data
//!
//! A bad file never stops a run. Each problem becomes an issue recorded in the
//! manifest, with a severity and a flag saying whether it should fail the
//! run. The manifest is always written, so the next run has a baseline even
//! after a failure.

pub mod config;
pub mod fsops;
pub mod incremental;
pub mod issues;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod ordering;
pub mod organize;
pub mod output;
pub mod schema;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

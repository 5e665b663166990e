//! The organize pipeline: source directory in, links and manifest out.
//!
//! ```text
//! list files → reuse check → extract → hash → order → name → link → manifest
//! ```
//!
//! One run works on a flat source directory. Files carried over from the
//! previous manifest skip straight to the merge step with their record
//! untouched. Everything else is extracted, ordered as one batch, and named
//! with the reused names already reserved, so a new photo can never take a name
//! that is still on disk.
//!
//! Per-file problems never stop the run. They are recorded as issues and the
//! manifest is written regardless; a blocking issue marks it `failed`. The
//! only hard errors are the ones that make writing a manifest impossible:
//! an unreadable source directory, a destination that cannot take atomic
//! writes, or a manifest that fails to save.
//!
//! In dry-run mode nothing in the destination changes except
//! `manifest.dryrun.json`: no links are created or removed, and the real
//! `manifest.json` is read but never written.

use crate::config::Config;
use crate::fsops::{FileStat, FileSystem, LocalFs};
use crate::incremental::{ReuseStats, config_affects_reprocessing, merge_pics, needs_reprocessing};
use crate::issues::{Issue, IssueKind, IssueLog, ProcessingSummary};
use crate::manifest::{
    DRY_RUN_MANIFEST_FILENAME, Gps, MANIFEST_FILENAME, Manifest, ManifestError, Pic,
    TimestampSource, load_manifest, now_seconds, save_manifest,
};
use crate::metadata::{ExifExtractor, ExtractProblem, MetadataExtractor, is_photo_path};
use crate::naming::generate_filename;
use crate::ordering::order;
use crate::types::{PhotoEntry, PhotoMetadata, file_name_of};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

const TIMESTAMP_FALLBACK: &str = "filename order";

#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot read source directory {}: {source}", path.display())]
    SourceDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Destination {} does not support atomic writes: {source}", path.display())]
    AtomicWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("{errors} blocking error(s); see {}", manifest.display())]
    Blocking { errors: usize, manifest: PathBuf },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Plan names and write `manifest.dryrun.json` without touching links.
    pub dry_run: bool,
}

/// Per-file progress, sent as each file is settled.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoEvent {
    /// Unchanged since the previous run; record carried over.
    Reused { source: String, dest: String },
    /// Named and linked in this run.
    Linked { source: String, dest: String },
    /// Named in a dry run; no link was made.
    Planned { source: String, dest: String },
    Skipped { source: String, kind: IssueKind },
    /// A link from the previous run whose source is gone was removed.
    Removed { dest: String },
}

/// Everything a caller needs to report on a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub summary: ProcessingSummary,
    pub stats: ReuseStats,
}

impl RunReport {
    pub fn has_blocking_errors(&self) -> bool {
        self.summary.has_blocking_errors
    }

    /// The run as a `Result`: `Err(Blocking)` when any blocking issue was
    /// recorded, so callers can exit non-zero after reporting.
    pub fn into_result(self) -> Result<Self, OrganizeError> {
        if self.has_blocking_errors() {
            return Err(OrganizeError::Blocking {
                errors: self.summary.errors_count,
                manifest: self.manifest_path,
            });
        }
        Ok(self)
    }
}

/// Organize `config.source_dir` into `config.dest_dir` with EXIF metadata
/// and the real filesystem.
pub fn organize(
    config: &Config,
    options: &RunOptions,
    events: Option<Sender<PhotoEvent>>,
) -> Result<RunReport, OrganizeError> {
    organize_with(&ExifExtractor, &LocalFs, config, options, events)
}

/// [`organize`] with explicit metadata and filesystem backends.
pub fn organize_with(
    extractor: &impl MetadataExtractor,
    fs: &impl FileSystem,
    config: &Config,
    options: &RunOptions,
    events: Option<Sender<PhotoEvent>>,
) -> Result<RunReport, OrganizeError> {
    let dest_dir = &config.dest_dir;
    fs.create_dir_all(dest_dir)?;
    fs.check_atomic_write(dest_dir)
        .map_err(|source| OrganizeError::AtomicWrite {
            path: dest_dir.clone(),
            source,
        })?;

    let snapshot = config.snapshot()?;
    let previous = load_manifest(&dest_dir.join(MANIFEST_FILENAME));
    let reusable = previous
        .as_ref()
        .filter(|_| !config.force_reprocess)
        .filter(|prev| match &prev.config {
            Some(old) => !config_affects_reprocessing(old, &snapshot),
            None => false,
        });
    if previous.is_some() && reusable.is_none() {
        tracing::info!("previous manifest not reusable; reprocessing every file");
    }

    let files = fs
        .list_files(&config.source_dir)
        .map_err(|source| OrganizeError::SourceDir {
            path: config.source_dir.clone(),
            source,
        })?;

    let mut run = Run::new(events);
    let mut reused = Vec::new();
    let mut entries = Vec::new();
    let mut candidates = HashMap::new();
    let mut total_files = 0;

    for path in files {
        let name = file_name_of(&path);
        if name.starts_with('.') {
            continue;
        }
        total_files += 1;

        if !is_photo_path(&path) {
            run.skip(Issue::unsupported_format(&name));
            continue;
        }

        let source_path = path.to_string_lossy().into_owned();
        if let Some((position, prev)) = reusable.and_then(|m| m.locate_source(&source_path)) {
            let link = (!options.dry_run).then(|| dest_dir.join(&prev.dest_path));
            let link_intact = link
                .as_deref()
                .is_none_or(|link| link_resolves_to(fs, link, &path));
            if link_intact
                && !needs_reprocessing(fs, &path, Some(&prev.hash), prev.mtime, link.as_deref())
            {
                tracing::debug!(source = %name, dest = %prev.dest_path, "unchanged");
                run.stats.reuse();
                run.emit(PhotoEvent::Reused {
                    source: source_path,
                    dest: prev.dest_path.clone(),
                });
                reused.push((position, prev.clone()));
                continue;
            }
        }

        if let Some(candidate) = run.inspect(extractor, fs, &path, &name) {
            entries.push(PhotoEntry::new(path.clone(), candidate.metadata.clone()));
            candidates.insert(path, candidate);
        }
    }

    // Listing order is path order; reused records go back to their previous sequence
    reused.sort_by_key(|(position, _)| *position);
    let reused: Vec<Pic> = reused.into_iter().map(|(_, pic)| pic).collect();

    let mut taken: HashSet<String> = reused.iter().map(|p| p.dest_path.clone()).collect();
    let mut fresh = Vec::new();
    for entry in order(entries) {
        let Some(candidate) = candidates.remove(&entry.path) else {
            continue;
        };
        let name = entry.file_name();
        let extension = extension_of(&entry.path);
        let dest = match generate_filename(
            &entry.metadata,
            &config.collection_name,
            &extension,
            &taken,
        ) {
            Ok(dest) => dest,
            Err(e) => {
                run.skip(Issue::file_skipped(&name, e.to_string()));
                continue;
            }
        };
        taken.insert(dest.clone());

        let mut pic = candidate.into_pic(&entry.path, dest);
        let source = pic.source_path.clone();
        if options.dry_run {
            run.emit(PhotoEvent::Planned {
                source,
                dest: pic.dest_path.clone(),
            });
        } else {
            match link_photo(fs, &entry.path, &dest_dir.join(&pic.dest_path)) {
                Ok(()) => run.emit(PhotoEvent::Linked {
                    source,
                    dest: pic.dest_path.clone(),
                }),
                Err(e) => {
                    let issue = Issue::filesystem_error(
                        &name,
                        format!("cannot link {}: {e}", pic.dest_path),
                    )
                    .processed();
                    run.log.record(issue.clone());
                    pic.errors.push(issue);
                }
            }
        }
        run.stats.process();
        fresh.push(pic);
    }

    if let Some(prev) = &previous
        && !options.dry_run
    {
        remove_stale_links(fs, dest_dir, prev, &taken, &mut run);
    }

    let pics = merge_pics(reused, fresh);
    let summary = run.log.summarize(total_files, pics.len());

    let mut manifest = Manifest::new(config.collection_name.clone(), now_seconds());
    manifest.collection_description = config.collection_description.clone();
    manifest.pics = pics;
    manifest.config = Some(snapshot);
    manifest.errors = run.log.skipped_errors();
    manifest.warnings = run.log.skipped_warnings();
    manifest.processing_status = Some((&summary).into());

    let manifest_path = dest_dir.join(if options.dry_run {
        DRY_RUN_MANIFEST_FILENAME
    } else {
        MANIFEST_FILENAME
    });
    save_manifest(fs, &manifest_path, &manifest)?;
    tracing::info!(
        path = %manifest_path.display(),
        status = ?summary.status,
        stats = %run.stats,
        "run finished"
    );

    Ok(RunReport {
        manifest,
        manifest_path,
        summary,
        stats: run.stats,
    })
}

/// Mutable state threaded through one run.
struct Run {
    log: IssueLog,
    stats: ReuseStats,
    events: Option<Sender<PhotoEvent>>,
}

impl Run {
    fn new(events: Option<Sender<PhotoEvent>>) -> Self {
        Self {
            log: IssueLog::new(),
            stats: ReuseStats::default(),
            events,
        }
    }

    fn emit(&self, event: PhotoEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }

    fn skip(&mut self, issue: Issue) {
        self.emit(PhotoEvent::Skipped {
            source: issue.source_file.clone(),
            kind: issue.error_type,
        });
        self.log.record(issue);
    }

    /// Stat, extract and hash one file. `None` when the file was skipped.
    fn inspect(
        &mut self,
        extractor: &impl MetadataExtractor,
        fs: &impl FileSystem,
        path: &Path,
        name: &str,
    ) -> Option<Candidate> {
        let stat = match fs.stat(path) {
            Ok(stat) => stat,
            Err(e) => {
                self.skip(Issue::filesystem_error(name, e.to_string()));
                return None;
            }
        };

        let extraction = extractor.extract(path);
        let mut issues = Vec::new();
        match extraction.problem {
            None if extraction.metadata.timestamp.is_none() => issues.push(Issue::exif_error(
                name,
                "no DateTimeOriginal",
                Some(TIMESTAMP_FALLBACK),
            )),
            None => {}
            Some(ExtractProblem::Missing(details)) => {
                issues.push(Issue::exif_error(name, details, Some(TIMESTAMP_FALLBACK)))
            }
            Some(ExtractProblem::Corrupted(details)) => {
                self.skip(Issue::corrupted_file(name, details));
                return None;
            }
            Some(ExtractProblem::Unreadable(details)) => {
                self.skip(Issue::filesystem_error(name, details));
                return None;
            }
        }

        let hash = match fs.hash_file(path) {
            Ok(hash) => hash,
            Err(e) => {
                self.skip(Issue::filesystem_error(name, e.to_string()));
                return None;
            }
        };

        for issue in &issues {
            self.log.record(issue.clone());
        }
        Some(Candidate {
            metadata: extraction.metadata,
            stat,
            hash,
            issues,
        })
    }
}

/// A file that made it through extraction and awaits its name.
struct Candidate {
    metadata: PhotoMetadata,
    stat: FileStat,
    hash: String,
    issues: Vec<Issue>,
}

impl Candidate {
    fn into_pic(self, path: &Path, dest_path: String) -> Pic {
        let camera = self.metadata.camera().label();
        Pic {
            source_path: path.to_string_lossy().into_owned(),
            dest_path,
            hash: self.hash,
            size_bytes: self.stat.size,
            mtime: Some(self.stat.mtime),
            timestamp: self.metadata.timestamp,
            timestamp_source: Some(if self.metadata.timestamp.is_some() {
                TimestampSource::Exif
            } else {
                TimestampSource::Filename
            }),
            camera,
            gps: self.metadata.gps().map(|(lat, lon)| Gps { lat, lon }),
            errors: self.issues.into_iter().map(Issue::processed).collect(),
        }
    }
}

/// `.jpg` for `IMG_1.JPG`; empty when there is no extension.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// True when `link` is a symlink to the canonical path of `source`.
fn link_resolves_to(fs: &impl FileSystem, link: &Path, source: &Path) -> bool {
    fs.canonicalize(source)
        .is_ok_and(|target| fs.link_points_to(link, &target))
}

fn link_photo(fs: &impl FileSystem, source: &Path, link: &Path) -> std::io::Result<()> {
    let target = fs.canonicalize(source)?;
    if fs.link_points_to(link, &target) {
        return Ok(());
    }
    fs.create_link(&target, link)
}

fn remove_stale_links(
    fs: &impl FileSystem,
    dest_dir: &Path,
    previous: &Manifest,
    keep: &HashSet<String>,
    run: &mut Run,
) {
    for pic in previous.pics.iter().filter(|p| !keep.contains(&p.dest_path)) {
        match fs.remove_link(&dest_dir.join(&pic.dest_path)) {
            Ok(true) => {
                tracing::debug!(dest = %pic.dest_path, "removed stale link");
                run.emit(PhotoEvent::Removed {
                    dest: pic.dest_path.clone(),
                });
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(dest = %pic.dest_path, error = %e, "cannot remove stale link"),
        }
    }
}

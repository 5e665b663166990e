//! Deterministic total order over a batch of photos.
//!
//! Ordering happens in two passes:
//!
//! 1. **Temporal sort.** Timestamped photos come first, keyed by
//!    `(second, sub-second presence, sub-second, file name, path)`. A photo
//!    that carries a sub-second value sorts ahead of a same-second photo
//!    without one, even when the value is `0`. Photos with no timestamp follow,
//!    ordered by file name. Modification times are never consulted.
//!
//! 2. **Burst preservation.** Within a run of photos sharing the same whole
//!    second, photos from different cameras can interleave after the sort.
//!    Such a run is split into per-camera groups that keep their internal
//!    order, and the groups are emitted by the timestamp of their first photo.
//!
//! The result never depends on input order: every comparison ends in the
//! full path, which is unique within a batch.

use crate::types::PhotoEntry;
use std::cmp::Ordering;

/// Sort entries into their final sequence.
pub fn order(mut entries: Vec<PhotoEntry>) -> Vec<PhotoEntry> {
    entries.sort_by(compare_entries);
    preserve_bursts(entries)
}

fn compare_entries(a: &PhotoEntry, b: &PhotoEntry) -> Ordering {
    match (a.metadata.timestamp, b.metadata.timestamp) {
        (Some(ta), Some(tb)) => ta
            .cmp(&tb)
            .then_with(|| subsecond_rank(a).cmp(&subsecond_rank(b)))
            .then_with(|| compare_names(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_names(a, b),
    }
}

fn subsecond_rank(entry: &PhotoEntry) -> (u8, u32) {
    match entry.metadata.subsecond {
        Some(ms) => (0, ms),
        None => (1, 0),
    }
}

fn compare_names(a: &PhotoEntry, b: &PhotoEntry) -> Ordering {
    a.file_name()
        .cmp(&b.file_name())
        .then_with(|| a.path.cmp(&b.path))
}

/// Regroup same-second runs that mix cameras. Expects sorted input.
fn preserve_bursts(sorted: Vec<PhotoEntry>) -> Vec<PhotoEntry> {
    let mut out = Vec::with_capacity(sorted.len());
    let mut iter = sorted.into_iter().peekable();

    while let Some(first) = iter.next() {
        let Some(second) = first.metadata.timestamp else {
            out.push(first);
            continue;
        };
        let mut run = vec![first];
        while let Some(next) = iter.next_if(|e| e.metadata.timestamp == Some(second)) {
            run.push(next);
        }
        out.extend(regroup_run(run));
    }
    out
}

fn regroup_run(run: Vec<PhotoEntry>) -> Vec<PhotoEntry> {
    if run.len() < 2 {
        return run;
    }

    let mut groups: Vec<(String, Vec<PhotoEntry>)> = Vec::new();
    for entry in run {
        let key = entry.metadata.camera().key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(entry),
            None => groups.push((key, vec![entry])),
        }
    }

    if groups.len() > 1 {
        // Stable: equal ranks keep order of first appearance.
        groups.sort_by_key(|(_, members)| group_rank(members));
    }
    groups.into_iter().flat_map(|(_, members)| members).collect()
}

fn group_rank(members: &[PhotoEntry]) -> u32 {
    members
        .first()
        .and_then(|e| e.metadata.subsecond)
        .unwrap_or(0)
}

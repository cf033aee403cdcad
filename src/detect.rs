//! Change detection: diff the current snapshot against the baseline.
//!
//! Equality is (size, mtime-within-tolerance) by default. In hash mode a
//! SHA-256 is computed for new files and for changed candidates; a candidate
//! whose digest matches the baseline's recorded digest was merely touched
//! and counts as unchanged. Hashing is deliberately lazy: routine detection
//! never digests the whole corpus.

use anyhow::Result;
use std::path::Path;

use crate::models::{ChangeSet, FileFingerprint, Snapshot};
use crate::scanner;

/// Filesystem mtime resolution tolerance. Two mtimes within one second of
/// each other count as the same timestamp.
const MTIME_TOLERANCE_MS: i64 = 1000;

/// Compare `current` against `baseline` and split every path into exactly
/// one of new / changed / deleted / unchanged.
///
/// `current` is updated in place with any hashes computed along the way, and
/// unchanged files inherit the baseline's recorded hash, so a later manifest
/// commit of `current` keeps all still-valid digests.
pub fn detect_changes(
    upstream_root: &Path,
    baseline: &Snapshot,
    current: &mut Snapshot,
    hash_mode: bool,
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::default();

    // New files: in the current tree but not the baseline.
    for (key, fp) in current.iter_mut() {
        if baseline.contains_key(key) {
            continue;
        }
        if hash_mode {
            fp.sha256 = Some(scanner::hash_file(&upstream_root.join(&fp.rel_path))?);
        }
        changes.new.push(fp.clone());
    }

    // Deleted files: in the baseline but gone from the current tree.
    for (key, fp) in baseline {
        if !current.contains_key(key) {
            changes.deleted.push(fp.clone());
        }
    }

    // Files present in both: compare fingerprints.
    for (key, old_fp) in baseline {
        let Some(new_fp) = current.get_mut(key) else {
            continue;
        };

        if fingerprints_equal(old_fp, new_fp) {
            if new_fp.sha256.is_none() {
                new_fp.sha256 = old_fp.sha256.clone();
            }
            changes.unchanged += 1;
            continue;
        }

        if hash_mode {
            let digest = scanner::hash_file(&upstream_root.join(&new_fp.rel_path))?;
            new_fp.sha256 = Some(digest);
            if old_fp.sha256.is_some() && old_fp.sha256 == new_fp.sha256 {
                // Touched but content-identical.
                changes.unchanged += 1;
                continue;
            }
        }

        changes.changed.push((old_fp.clone(), new_fp.clone()));
    }

    Ok(changes)
}

fn fingerprints_equal(old: &FileFingerprint, new: &FileFingerprint) -> bool {
    old.size == new.size
        && (old.modified - new.modified).num_milliseconds().abs() <= MTIME_TOLERANCE_MS
}

//! Upstream tree scanner.
//!
//! Walks the upstream root and produces a complete fingerprint snapshot of
//! every eligible file, or fails outright when the root is missing; never a
//! partial snapshot. Eligibility is glob-driven: the include set tracks the
//! data extensions the collector produces, the exclude set drops hidden
//! paths and the collector's own leading-underscore bookkeeping files.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

use crate::classify::DatasetPatterns;
use crate::config::ScannerConfig;
use crate::models::{FileFingerprint, Snapshot};

pub fn scan_upstream(
    root: &Path,
    scanner: &ScannerConfig,
    patterns: &DatasetPatterns,
) -> Result<Snapshot> {
    if !root.exists() {
        bail!("Upstream root does not exist: {}", root.display());
    }
    if !root.is_dir() {
        bail!("Upstream root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&scanner.include_globs, true)?;
    let exclude_set = build_globset(&scanner.exclude_globs, false)?;

    let mut snapshot = Snapshot::new();

    let walker = WalkDir::new(root).follow_links(scanner.follow_symlinks);
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        let fp = fingerprint_file(path, &rel_str, patterns)
            .with_context(|| format!("Failed to fingerprint {}", path.display()))?;
        snapshot.insert(rel_str, fp);
    }

    Ok(snapshot)
}

fn fingerprint_file(
    path: &Path,
    rel_path: &str,
    patterns: &DatasetPatterns,
) -> Result<FileFingerprint> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);

    Ok(FileFingerprint {
        rel_path: rel_path.to_string(),
        size: metadata.len(),
        modified,
        sha256: None,
        dataset: patterns.classify(rel_path).to_string(),
    })
}

/// SHA-256 hex digest of a file, streamed in 1 MiB chunks so large upstream
/// archives never land in memory whole.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1 << 20];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn build_globset(globs: &[String], case_insensitive: bool) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        let glob = if case_insensitive {
            GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        } else {
            Glob::new(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?
        };
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn patterns() -> DatasetPatterns {
        DatasetPatterns::new(&[("PERM", "PERM"), ("LCA", "LCA")]).unwrap()
    }

    fn scan(root: &Path) -> Snapshot {
        scan_upstream(root, &ScannerConfig::default(), &patterns()).unwrap()
    }

    #[test]
    fn fingerprints_tracked_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("PERM/FY2024")).unwrap();
        fs::write(tmp.path().join("PERM/FY2024/part1.xlsx"), b"abcdef").unwrap();

        let snapshot = scan(tmp.path());
        assert_eq!(snapshot.len(), 1);
        let fp = snapshot.get("PERM/FY2024/part1.xlsx").unwrap();
        assert_eq!(fp.size, 6);
        assert_eq!(fp.dataset, "PERM");
        assert!(fp.sha256.is_none());
    }

    #[test]
    fn skips_untracked_extensions_and_control_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("PERM")).unwrap();
        fs::write(tmp.path().join("PERM/data.csv"), b"x").unwrap();
        fs::write(tmp.path().join("PERM/_state.json"), b"x").unwrap();
        fs::write(tmp.path().join("PERM/.hidden.csv"), b"x").unwrap();
        fs::write(tmp.path().join("PERM/notes.log"), b"x").unwrap();

        let snapshot = scan(tmp.path());
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("PERM/data.csv"));
    }

    #[test]
    fn skips_files_under_hidden_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".cache/PERM")).unwrap();
        fs::write(tmp.path().join(".cache/PERM/data.csv"), b"x").unwrap();

        let snapshot = scan(tmp.path());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("LCA")).unwrap();
        fs::write(tmp.path().join("LCA/Q1.XLSX"), b"x").unwrap();

        let snapshot = scan(tmp.path());
        assert!(snapshot.contains_key("LCA/Q1.XLSX"));
    }

    #[test]
    fn unmatched_directory_classifies_unknown() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Surprise")).unwrap();
        fs::write(tmp.path().join("Surprise/data.csv"), b"x").unwrap();

        let snapshot = scan(tmp.path());
        assert_eq!(snapshot.get("Surprise/data.csv").unwrap().dataset, "UNKNOWN");
    }

    #[test]
    fn missing_root_is_fatal() {
        let result = scan_upstream(
            Path::new("/nonexistent/upstream"),
            &ScannerConfig::default(),
            &patterns(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn hash_file_digests_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.csv");
        fs::write(&path, b"hello").unwrap();
        // SHA-256 of "hello".
        assert_eq!(
            hash_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}

//! Baseline manifest persistence.
//!
//! The manifest is the only durable state the engine keeps: a JSON document
//! holding the last known-good fingerprint snapshot. It is overwritten only
//! after a fully successful execute run (or explicitly via `init`), and the
//! write is tmp-file-then-rename so an interrupted commit can never corrupt
//! or truncate the previously committed baseline.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classify::DatasetPatterns;
use crate::config::Config;
use crate::models::{FileFingerprint, Snapshot};
use crate::scanner;

/// Bumped when the record layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub snapshot_time: DateTime<Utc>,
    pub records: Vec<FileFingerprint>,
}

impl Manifest {
    /// Build a manifest from a snapshot. Records come out sorted by
    /// relative path (the snapshot map is ordered).
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            snapshot_time: Utc::now(),
            records: snapshot.values().cloned().collect(),
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        self.records
            .iter()
            .map(|fp| (fp.rel_path.clone(), fp.clone()))
            .collect()
    }
}

/// Load the committed manifest. A missing file is a valid state: the
/// baseline is simply empty and every current file will look new.
pub fn load(path: &Path) -> Result<Option<Manifest>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
    if manifest.format_version != FORMAT_VERSION {
        bail!(
            "Manifest format version {} is not supported (expected {}): {}",
            manifest.format_version,
            FORMAT_VERSION,
            path.display()
        );
    }
    Ok(Some(manifest))
}

/// Load the committed manifest, erroring when none exists.
pub fn load_required(path: &Path) -> Result<Manifest> {
    match load(path)? {
        Some(manifest) => Ok(manifest),
        None => bail!(
            "No manifest at {} — run `upk init` to record a baseline",
            path.display()
        ),
    }
}

/// Atomically replace the manifest: write the full document to a sibling
/// `.tmp` file, then rename over the target. A crash between the two steps
/// leaves the previous manifest byte-identical.
pub fn save(path: &Path, manifest: &Manifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to commit manifest to {}", path.display()))?;

    Ok(())
}

/// `upk init`: persist the current upstream snapshot as the baseline
/// without planning or running any rebuild. Used to bootstrap the manifest
/// and to record state after an out-of-band full rebuild.
pub fn run_init(config: &Config, patterns: &DatasetPatterns, hash: bool) -> Result<()> {
    let mut snapshot = scanner::scan_upstream(&config.upstream.root, &config.scanner, patterns)?;

    if hash {
        for fp in snapshot.values_mut() {
            let abs = config.upstream.root.join(&fp.rel_path);
            fp.sha256 = Some(scanner::hash_file(&abs)?);
        }
    }

    let manifest = Manifest::from_snapshot(&snapshot);
    save(&config.manifest.path, &manifest)?;

    println!(
        "Baseline initialized: {} files → {}",
        manifest.records.len(),
        config.manifest.path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn fingerprint(path: &str) -> FileFingerprint {
        FileFingerprint {
            rel_path: path.to_string(),
            size: 123,
            modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            sha256: None,
            dataset: "PERM".to_string(),
        }
    }

    fn snapshot_of(paths: &[&str]) -> Snapshot {
        paths
            .iter()
            .map(|p| (p.to_string(), fingerprint(p)))
            .collect()
    }

    #[test]
    fn save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");

        let manifest = Manifest::from_snapshot(&snapshot_of(&["PERM/a.csv", "PERM/b.csv"]));
        save(&path, &manifest).unwrap();

        let loaded = load(&path).unwrap().expect("manifest should exist");
        assert_eq!(loaded.format_version, FORMAT_VERSION);
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].rel_path, "PERM/a.csv");
    }

    #[test]
    fn missing_manifest_is_empty_baseline() {
        let tmp = TempDir::new().unwrap();
        assert!(load(&tmp.path().join("manifest.json")).unwrap().is_none());
    }

    #[test]
    fn load_required_hints_at_init() {
        let tmp = TempDir::new().unwrap();
        let err = load_required(&tmp.path().join("manifest.json")).unwrap_err();
        assert!(err.to_string().contains("init"));
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("artifacts/metrics/manifest.json");
        save(&path, &Manifest::from_snapshot(&Snapshot::new())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn interrupted_commit_leaves_baseline_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");

        save(&path, &Manifest::from_snapshot(&snapshot_of(&["PERM/a.csv"]))).unwrap();
        let committed = fs::read(&path).unwrap();

        // A process killed after writing the tmp file but before the rename
        // leaves exactly this state behind.
        fs::write(path.with_extension("tmp"), b"{ half-written garbage").unwrap();

        assert_eq!(fs::read(&path).unwrap(), committed);
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.records.len(), 1);
    }

    #[test]
    fn unsupported_version_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");

        let mut manifest = Manifest::from_snapshot(&Snapshot::new());
        manifest.format_version = 99;
        let json = serde_json::to_string_pretty(&manifest).unwrap();
        fs::write(&path, json).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("format version"));
    }

    #[test]
    fn roundtrip_preserves_optional_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");

        let mut snapshot = snapshot_of(&["PERM/a.csv"]);
        snapshot.get_mut("PERM/a.csv").unwrap().sha256 = Some("deadbeef".to_string());
        save(&path, &Manifest::from_snapshot(&snapshot)).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.records[0].sha256.as_deref(), Some("deadbeef"));

        // Hashless records serialize without the field at all.
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.matches("sha256").count(), 1);
    }
}

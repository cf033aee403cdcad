//! Core data types used throughout upkeep.
//!
//! These types represent the file fingerprints, change sets, and rebuild
//! actions that flow through the detect → plan → execute pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fingerprint of a single file under the upstream root.
///
/// Default identity is (size, mtime); `sha256` is present only when hash
/// mode computed it, so two fingerprints may legitimately differ in whether
/// they carry a hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Path relative to the upstream root, `/`-separated.
    pub rel_path: String,
    /// File size in bytes.
    pub size: u64,
    /// Filesystem modification time.
    pub modified: DateTime<Utc>,
    /// SHA-256 hex digest, when hash mode has computed one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sha256: Option<String>,
    /// Dataset bucket this file classifies into (may be `UNKNOWN`).
    pub dataset: String,
}

/// Complete fingerprint snapshot of the upstream tree, keyed by relative path.
pub type Snapshot = BTreeMap<String, FileFingerprint>;

/// Result of comparing a current snapshot against the baseline manifest.
///
/// The three lists are pairwise disjoint: a path appears in at most one.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub new: Vec<FileFingerprint>,
    /// (baseline, current) pairs for files present in both but different.
    pub changed: Vec<(FileFingerprint, FileFingerprint)>,
    pub deleted: Vec<FileFingerprint>,
    pub unchanged: usize,
}

/// Per-dataset change counts, derived from a [`ChangeSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetChanges {
    pub new: usize,
    pub changed: usize,
    pub deleted: usize,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.new.is_empty() || !self.changed.is_empty() || !self.deleted.is_empty()
    }

    /// One-line human summary, e.g. `"2 new, 1 changed (310 unchanged)"`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.new.is_empty() {
            parts.push(format!("{} new", self.new.len()));
        }
        if !self.changed.is_empty() {
            parts.push(format!("{} changed", self.changed.len()));
        }
        if !self.deleted.is_empty() {
            parts.push(format!("{} deleted", self.deleted.len()));
        }
        if parts.is_empty() {
            return format!("no changes ({} files unchanged)", self.unchanged);
        }
        format!("{} ({} unchanged)", parts.join(", "), self.unchanged)
    }

    /// Sparse per-dataset summary: datasets with zero affected files are
    /// omitted entirely.
    pub fn by_dataset(&self) -> BTreeMap<String, DatasetChanges> {
        let mut summary: BTreeMap<String, DatasetChanges> = BTreeMap::new();
        for fp in &self.new {
            summary.entry(fp.dataset.clone()).or_default().new += 1;
        }
        for (_, current) in &self.changed {
            summary.entry(current.dataset.clone()).or_default().changed += 1;
        }
        for fp in &self.deleted {
            summary.entry(fp.dataset.clone()).or_default().deleted += 1;
        }
        summary
    }
}

/// Pipeline stage of a downstream artifact. The derived ordering is the
/// rebuild ordering: a feature table must never build against a stale
/// curated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Curate,
    Feature,
    Model,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Curate => "curate",
            Stage::Feature => "feature",
            Stage::Model => "model",
            Stage::Export => "export",
        };
        write!(f, "{}", label)
    }
}

/// An external builder invocation: a program plus argv, no shell involved.
///
/// Arguments may contain the literal `{upstream_root}` placeholder, resolved
/// when the plan is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BuildCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Replace the `{upstream_root}` placeholder in every argument.
    pub fn resolve(&self, upstream_root: &Path) -> BuildCommand {
        let root = upstream_root.to_string_lossy();
        BuildCommand {
            program: self.program.clone(),
            args: self
                .args
                .iter()
                .map(|a| a.replace("{upstream_root}", &root))
                .collect(),
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Default reason template for planned actions; `{dataset}` expands to the
/// comma-joined list of triggering datasets.
pub const DEFAULT_REASON_TEMPLATE: &str = "changes in {dataset}";

/// One downstream artifact a dataset feeds, as registered in the
/// dependency graph.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    /// Artifact name, e.g. `fact_perm/` or `employer_features.parquet`.
    pub artifact: String,
    pub stage: Stage,
    pub command: BuildCommand,
    pub reason_template: String,
}

impl ArtifactSpec {
    pub fn new(artifact: &str, stage: Stage, command: BuildCommand) -> Self {
        Self {
            artifact: artifact.to_string(),
            stage,
            command,
            reason_template: DEFAULT_REASON_TEMPLATE.to_string(),
        }
    }

    /// Override the default reason template.
    pub fn with_reason(mut self, template: &str) -> Self {
        self.reason_template = template.to_string();
        self
    }

    pub fn render_reason(&self, datasets: &[String]) -> String {
        self.reason_template
            .replace("{dataset}", &datasets.join(", "))
    }
}

/// Outcome of a planned rebuild action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Success => "success",
            ActionStatus::Failed => "failed",
            ActionStatus::Skipped => "skipped",
        };
        write!(f, "{}", label)
    }
}

/// One planned invocation of a builder command, tied to exactly one
/// artifact. Created fresh on every planning run and never persisted;
/// only the manifest encodes durable state.
#[derive(Debug, Clone)]
pub struct RebuildAction {
    pub artifact: String,
    pub stage: Stage,
    pub command: BuildCommand,
    pub reason: String,
    /// Datasets whose changes triggered this action (one or more).
    pub triggered_by: Vec<String>,
    pub status: ActionStatus,
}

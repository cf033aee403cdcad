//! Dataset classification: map a relative path to its logical dataset.
//!
//! The registry is an ordered list of (path prefix → dataset name) entries.
//! The longest matching prefix wins, independent of registration order, so a
//! metadata subtree nested inside another dataset's directory (e.g.
//! `DOL_Record_Layouts/LCA` inside a tree that also has a top-level `LCA`)
//! classifies under its own entry rather than its parent's.

use anyhow::{bail, Result};

/// Dataset name returned when no registered prefix matches a path.
pub const UNKNOWN_DATASET: &str = "UNKNOWN";

/// Ordered (prefix, dataset) registry. Built once at startup and passed
/// explicitly into the scanner and planner; tests substitute their own.
#[derive(Debug, Clone)]
pub struct DatasetPatterns {
    entries: Vec<(String, String)>,
}

impl DatasetPatterns {
    /// Build a registry from (prefix, dataset) pairs.
    ///
    /// Prefixes are normalized (trailing `/` stripped) and must be unique.
    /// Matching is bounded at path components, so two distinct prefixes of
    /// equal length can never both match one path; a tie would require
    /// identical prefixes, which this constructor rejects.
    pub fn new(entries: &[(&str, &str)]) -> Result<Self> {
        let mut normalized: Vec<(String, String)> = Vec::with_capacity(entries.len());
        for (prefix, dataset) in entries {
            let prefix = prefix.trim_end_matches('/');
            if prefix.is_empty() {
                bail!("dataset pattern must not be empty (dataset '{}')", dataset);
            }
            if normalized.iter().any(|(p, _)| p == prefix) {
                bail!("duplicate dataset pattern: '{}'", prefix);
            }
            normalized.push((prefix.to_string(), dataset.to_string()));
        }
        Ok(Self {
            entries: normalized,
        })
    }

    /// Classify a relative path into a dataset bucket.
    ///
    /// Returns [`UNKNOWN_DATASET`] when nothing matches. That is a valid,
    /// reported outcome, not an error.
    pub fn classify(&self, rel_path: &str) -> &str {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, dataset) in &self.entries {
            if !prefix_matches(prefix, rel_path) {
                continue;
            }
            match best {
                Some((current, _)) if current.len() >= prefix.len() => {}
                _ => best = Some((prefix, dataset)),
            }
        }
        best.map(|(_, dataset)| dataset).unwrap_or(UNKNOWN_DATASET)
    }

    /// Registered (prefix, dataset) pairs in registration order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// A prefix matches a path only at component boundaries: `LCA` matches
/// `LCA/x.csv` but not `LCA_backup/x.csv`.
fn prefix_matches(prefix: &str, rel_path: &str) -> bool {
    rel_path == prefix
        || (rel_path.len() > prefix.len()
            && rel_path.starts_with(prefix)
            && rel_path.as_bytes()[prefix.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DatasetPatterns {
        DatasetPatterns::new(&[
            ("LCA", "LCA"),
            ("PERM", "PERM"),
            ("DOL_Record_Layouts", "DOL_RECORD_LAYOUTS"),
            ("DOL_Record_Layouts/LCA", "DOL_RECORD_LAYOUTS"),
        ])
        .unwrap()
    }

    #[test]
    fn classifies_by_top_level_prefix() {
        let patterns = registry();
        assert_eq!(patterns.classify("PERM/FY2024/part1.xlsx"), "PERM");
        assert_eq!(patterns.classify("LCA/2024/q1.csv"), "LCA");
    }

    #[test]
    fn longest_match_wins() {
        let patterns = registry();
        assert_eq!(
            patterns.classify("DOL_Record_Layouts/LCA/file1.pdf"),
            "DOL_RECORD_LAYOUTS"
        );
    }

    #[test]
    fn shorter_pattern_never_reclassifies_longer_match() {
        // Same registry with the short pattern added last: order must not
        // matter, the nested subtree stays with its longer entry.
        let patterns = DatasetPatterns::new(&[
            ("DOL_Record_Layouts/LCA", "DOL_RECORD_LAYOUTS"),
            ("LCA", "LCA"),
        ])
        .unwrap();
        assert_eq!(
            patterns.classify("DOL_Record_Layouts/LCA/file1.pdf"),
            "DOL_RECORD_LAYOUTS"
        );
        assert_eq!(patterns.classify("LCA/file1.pdf"), "LCA");
    }

    #[test]
    fn unmatched_path_is_unknown() {
        let patterns = registry();
        assert_eq!(patterns.classify("Mystery_Data/file.csv"), UNKNOWN_DATASET);
    }

    #[test]
    fn prefix_bounded_at_path_components() {
        let patterns = registry();
        assert_eq!(patterns.classify("LCA_backup/file.csv"), UNKNOWN_DATASET);
        // Exact directory-as-file match still counts.
        assert_eq!(patterns.classify("LCA"), "LCA");
    }

    #[test]
    fn trailing_slash_normalized() {
        let patterns = DatasetPatterns::new(&[("BLS/", "BLS_CES")]).unwrap();
        assert_eq!(patterns.classify("BLS/ces_2025.json"), "BLS_CES");
    }

    #[test]
    fn duplicate_pattern_rejected() {
        let result = DatasetPatterns::new(&[("LCA", "LCA"), ("LCA/", "OTHER")]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_pattern_rejected() {
        assert!(DatasetPatterns::new(&[("", "X")]).is_err());
    }
}

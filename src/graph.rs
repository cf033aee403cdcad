//! Dependency graph: which downstream artifacts each dataset feeds.
//!
//! The graph is a static registry built once at startup and passed into the
//! planner as a value, not global state, so tests substitute their own
//! graphs freely. Registration order matters: the planner walks datasets in
//! the order they were registered, which makes plans deterministic
//! regardless of the order changes were discovered in.

use anyhow::{bail, Result};

use crate::models::ArtifactSpec;

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    entries: Vec<(String, Vec<ArtifactSpec>)>,
}

impl DependencyGraph {
    /// Build a graph from (dataset, artifact list) pairs. Dataset names
    /// must be unique; a dataset registered with an empty artifact list is
    /// valid (tracked reference data with nothing downstream).
    pub fn new(entries: Vec<(&str, Vec<ArtifactSpec>)>) -> Result<Self> {
        let mut built: Vec<(String, Vec<ArtifactSpec>)> = Vec::with_capacity(entries.len());
        for (dataset, artifacts) in entries {
            if built.iter().any(|(d, _)| d == dataset) {
                bail!("dataset '{}' registered twice in dependency graph", dataset);
            }
            built.push((dataset.to_string(), artifacts));
        }
        Ok(Self { entries: built })
    }

    /// Datasets in registration order.
    pub fn datasets(&self) -> impl Iterator<Item = (&str, &[ArtifactSpec])> {
        self.entries
            .iter()
            .map(|(d, specs)| (d.as_str(), specs.as_slice()))
    }

    pub fn contains(&self, dataset: &str) -> bool {
        self.entries.iter().any(|(d, _)| d == dataset)
    }

    pub fn artifacts(&self, dataset: &str) -> Option<&[ArtifactSpec]> {
        self.entries
            .iter()
            .find(|(d, _)| d == dataset)
            .map(|(_, specs)| specs.as_slice())
    }
}

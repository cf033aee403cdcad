use anyhow::Result;

use crate::classify::DatasetPatterns;
use crate::graph::DependencyGraph;
use crate::models::Stage;

/// List the compiled-in pattern registry and builder coverage.
pub fn list_datasets(patterns: &DatasetPatterns, graph: &DependencyGraph) -> Result<()> {
    println!("{:<28} {:<24} BUILDERS", "PATTERN", "DATASET");
    for (prefix, dataset) in patterns.entries() {
        let coverage = match graph.artifacts(dataset) {
            Some([]) => "none (reference data)".to_string(),
            Some(specs) => {
                let stages: Vec<Stage> = {
                    let mut s: Vec<Stage> = specs.iter().map(|a| a.stage).collect();
                    s.sort();
                    s.dedup();
                    s
                };
                let stage_list = stages
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} artifact(s): {}", specs.len(), stage_list)
            }
            None => "no builder yet".to_string(),
        };
        println!("{:<28} {:<24} {}", prefix, dataset, coverage);
    }
    Ok(())
}

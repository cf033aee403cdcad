//! Rebuild planning: turn a per-dataset change summary into a minimal,
//! stage-ordered list of builder invocations.
//!
//! Datasets are visited in the dependency graph's registration order, not
//! the order changes were discovered in, so two runs over the same change
//! set always emit the same plan. Each artifact appears at most once per
//! plan; every dataset that triggered it is recorded on the action.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::classify::{DatasetPatterns, UNKNOWN_DATASET};
use crate::config::Config;
use crate::detect;
use crate::graph::DependencyGraph;
use crate::manifest;
use crate::models::{
    ActionStatus, ArtifactSpec, ChangeSet, DatasetChanges, RebuildAction, Snapshot,
};
use crate::scanner;

/// A planning run's output: the stage-ordered actions plus the datasets
/// that changed but have nothing registered downstream.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub actions: Vec<RebuildAction>,
    /// Changed datasets with no dependency-graph entry ("no builder yet").
    pub no_builder: Vec<String>,
}

/// Build the rebuild plan for a set of affected datasets.
pub fn plan_rebuild(
    graph: &DependencyGraph,
    affected: &BTreeMap<String, DatasetChanges>,
    upstream_root: &Path,
) -> Plan {
    let mut plan = Plan::default();
    let mut action_index: HashMap<String, usize> = HashMap::new();
    let mut templates: HashMap<String, ArtifactSpec> = HashMap::new();

    for (dataset, specs) in graph.datasets() {
        if !affected.contains_key(dataset) {
            continue;
        }
        for spec in specs {
            append_trigger(
                &mut plan.actions,
                &mut action_index,
                &mut templates,
                spec,
                dataset,
                upstream_root,
            );
        }
    }

    // Changed datasets the graph knows nothing about. UNKNOWN is reported
    // separately by the caller; it never has a graph entry by definition.
    for dataset in affected.keys() {
        if !graph.contains(dataset) && dataset != UNKNOWN_DATASET {
            plan.no_builder.push(dataset.clone());
        }
    }

    // Prerequisites before dependents: a feature table rebuilt against a
    // stale curated table would silently omit new facts. The sort is
    // stable, so registration order holds within a stage.
    plan.actions.sort_by_key(|a| a.stage);

    plan
}

/// Plan a full rebuild: every dataset registered in the graph is treated as
/// changed, without consulting the baseline at all.
pub fn plan_full(graph: &DependencyGraph, upstream_root: &Path) -> Plan {
    let affected: BTreeMap<String, DatasetChanges> = graph
        .datasets()
        .map(|(dataset, _)| (dataset.to_string(), DatasetChanges::default()))
        .collect();
    let mut plan = plan_rebuild(graph, &affected, upstream_root);
    for action in &mut plan.actions {
        action.reason = "full rebuild requested".to_string();
    }
    plan
}

fn append_trigger(
    actions: &mut Vec<RebuildAction>,
    action_index: &mut HashMap<String, usize>,
    templates: &mut HashMap<String, ArtifactSpec>,
    spec: &ArtifactSpec,
    dataset: &str,
    upstream_root: &Path,
) {
    if let Some(&idx) = action_index.get(&spec.artifact) {
        // Another dataset already triggered this artifact in this run: one
        // action, both triggers.
        let action = &mut actions[idx];
        action.triggered_by.push(dataset.to_string());
        let template = &templates[&spec.artifact];
        action.reason = template.render_reason(&action.triggered_by);
        return;
    }

    let triggered_by = vec![dataset.to_string()];
    actions.push(RebuildAction {
        artifact: spec.artifact.clone(),
        stage: spec.stage,
        command: spec.command.resolve(upstream_root),
        reason: spec.render_reason(&triggered_by),
        triggered_by,
        status: ActionStatus::Pending,
    });
    action_index.insert(spec.artifact.clone(), actions.len() - 1);
    templates.insert(spec.artifact.clone(), spec.clone());
}

/// Shared detect phase for the `plan` and `execute` commands: load the
/// baseline, scan the upstream tree, and diff.
pub fn detect_current(
    config: &Config,
    patterns: &DatasetPatterns,
    hash: bool,
) -> Result<(Snapshot, ChangeSet)> {
    let baseline = manifest::load(&config.manifest.path)?
        .map(|m| m.to_snapshot())
        .unwrap_or_default();
    let mut current = scanner::scan_upstream(&config.upstream.root, &config.scanner, patterns)?;
    let changes = detect::detect_changes(&config.upstream.root, &baseline, &mut current, hash)?;
    Ok((current, changes))
}

/// Print the change summary and the plan, the way `upk plan` and
/// `upk execute` report it before running anything.
pub fn print_plan(changes: Option<&ChangeSet>, plan: &Plan) {
    if let Some(changes) = changes {
        println!("detected: {}", changes.summary());
        let summary = changes.by_dataset();
        for (dataset, counts) in &summary {
            let label = if dataset == UNKNOWN_DATASET {
                "UNKNOWN (no pattern matches; not rebuildable)"
            } else {
                dataset.as_str()
            };
            println!(
                "  {:<48} {} new, {} changed, {} deleted",
                label, counts.new, counts.changed, counts.deleted
            );
        }
    }

    for dataset in &plan.no_builder {
        println!("  note: dataset '{}' tracked, no builder yet", dataset);
    }

    if plan.actions.is_empty() {
        println!("plan: nothing to rebuild");
        return;
    }

    println!("plan: {} action(s)", plan.actions.len());
    let mut current_stage = None;
    for action in &plan.actions {
        if current_stage != Some(action.stage) {
            current_stage = Some(action.stage);
            println!("  --- stage: {} ---", action.stage);
        }
        println!("  [{}] {}", action.artifact, action.reason);
        println!("      $ {}", action.command);
    }
}

/// `upk plan`: detect changes and print the plan. Mutates nothing, so it is
/// safe to run as often as you like.
pub fn run_plan(
    config: &Config,
    patterns: &DatasetPatterns,
    graph: &DependencyGraph,
    hash: bool,
    full: bool,
) -> Result<()> {
    if full {
        let plan = plan_full(graph, &config.upstream.root);
        print_plan(None, &plan);
        return Ok(());
    }

    let (_, changes) = detect_current(config, patterns, hash)?;
    if !changes.has_changes() {
        println!("No changes detected — nothing to rebuild.");
        return Ok(());
    }

    let plan = plan_rebuild(graph, &changes.by_dataset(), &config.upstream.root);
    print_plan(Some(&changes), &plan);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildCommand, Stage};

    fn spec(artifact: &str, stage: Stage) -> ArtifactSpec {
        ArtifactSpec::new(artifact, stage, BuildCommand::new("true", &[]))
    }

    fn affected(datasets: &[&str]) -> BTreeMap<String, DatasetChanges> {
        datasets
            .iter()
            .map(|d| (d.to_string(), DatasetChanges::default()))
            .collect()
    }

    fn test_graph() -> DependencyGraph {
        DependencyGraph::new(vec![
            (
                "PERM",
                vec![
                    spec("fact_perm/", Stage::Curate),
                    spec("employer_features.parquet", Stage::Feature),
                    spec("employer_scores.parquet", Stage::Model),
                    spec("soc_demand_metrics.parquet", Stage::Export),
                ],
            ),
            (
                "LCA",
                vec![
                    spec("fact_lca/", Stage::Curate),
                    spec("soc_demand_metrics.parquet", Stage::Export),
                ],
            ),
            ("DOL_RECORD_LAYOUTS", vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn unaffected_datasets_produce_no_actions() {
        let plan = plan_rebuild(&test_graph(), &affected(&["LCA"]), Path::new("/up"));
        let artifacts: Vec<&str> = plan.actions.iter().map(|a| a.artifact.as_str()).collect();
        assert_eq!(artifacts, vec!["fact_lca/", "soc_demand_metrics.parquet"]);
    }

    #[test]
    fn shared_artifact_deduplicated_with_both_triggers() {
        let plan = plan_rebuild(&test_graph(), &affected(&["PERM", "LCA"]), Path::new("/up"));
        let soc: Vec<&RebuildAction> = plan
            .actions
            .iter()
            .filter(|a| a.artifact == "soc_demand_metrics.parquet")
            .collect();
        assert_eq!(soc.len(), 1);
        assert_eq!(soc[0].triggered_by, vec!["PERM", "LCA"]);
        assert_eq!(soc[0].reason, "changes in PERM, LCA");
    }

    #[test]
    fn plan_sorted_by_stage() {
        let plan = plan_rebuild(&test_graph(), &affected(&["PERM", "LCA"]), Path::new("/up"));
        let stages: Vec<Stage> = plan.actions.iter().map(|a| a.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        // Curate actions from both datasets precede the PERM feature build.
        assert!(stages.starts_with(&[Stage::Curate, Stage::Curate]));
    }

    #[test]
    fn end_to_end_perm_change_plans_full_chain_and_nothing_else() {
        let plan = plan_rebuild(&test_graph(), &affected(&["PERM"]), Path::new("/up"));
        let artifacts: Vec<&str> = plan.actions.iter().map(|a| a.artifact.as_str()).collect();
        assert_eq!(
            artifacts,
            vec![
                "fact_perm/",
                "employer_features.parquet",
                "employer_scores.parquet",
                "soc_demand_metrics.parquet",
            ]
        );
        assert!(!artifacts.contains(&"fact_lca/"));
    }

    #[test]
    fn dataset_without_graph_entry_reported_not_planned() {
        let plan = plan_rebuild(&test_graph(), &affected(&["TRAC"]), Path::new("/up"));
        assert!(plan.actions.is_empty());
        assert_eq!(plan.no_builder, vec!["TRAC"]);
    }

    #[test]
    fn unknown_dataset_not_reported_as_missing_builder() {
        let plan = plan_rebuild(&test_graph(), &affected(&["UNKNOWN"]), Path::new("/up"));
        assert!(plan.actions.is_empty());
        assert!(plan.no_builder.is_empty());
    }

    #[test]
    fn registered_dataset_with_no_artifacts_is_silent() {
        let plan = plan_rebuild(
            &test_graph(),
            &affected(&["DOL_RECORD_LAYOUTS"]),
            Path::new("/up"),
        );
        assert!(plan.actions.is_empty());
        assert!(plan.no_builder.is_empty());
    }

    #[test]
    fn graph_registration_order_not_discovery_order() {
        // BTreeMap iterates LCA before PERM; the plan must still follow the
        // graph's PERM-first registration order within the curate stage.
        let plan = plan_rebuild(&test_graph(), &affected(&["LCA", "PERM"]), Path::new("/up"));
        let curate: Vec<&str> = plan
            .actions
            .iter()
            .filter(|a| a.stage == Stage::Curate)
            .map(|a| a.artifact.as_str())
            .collect();
        assert_eq!(curate, vec!["fact_perm/", "fact_lca/"]);
    }

    #[test]
    fn full_plan_covers_every_registered_dataset() {
        let plan = plan_full(&test_graph(), Path::new("/up"));
        let artifacts: Vec<&str> = plan.actions.iter().map(|a| a.artifact.as_str()).collect();
        assert!(artifacts.contains(&"fact_perm/"));
        assert!(artifacts.contains(&"fact_lca/"));
        assert!(plan
            .actions
            .iter()
            .all(|a| a.reason == "full rebuild requested"));
    }

    #[test]
    fn command_placeholder_resolved_at_plan_time() {
        let graph = DependencyGraph::new(vec![(
            "WARN",
            vec![ArtifactSpec::new(
                "fact_warn_events.parquet",
                Stage::Curate,
                BuildCommand::new("python3", &["b.py", "--downloads", "{upstream_root}/WARN"]),
            )],
        )])
        .unwrap();
        let plan = plan_rebuild(&graph, &affected(&["WARN"]), Path::new("/data/p1"));
        assert_eq!(plan.actions[0].command.args[2], "/data/p1/WARN");
    }
}

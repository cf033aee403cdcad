//! Plan execution: run each rebuild action as an external process.
//!
//! Strictly sequential: downstream builders mutate shared artifact state
//! with no locking discipline of their own, so actions never run
//! concurrently even when provably independent. A failed action does not
//! abort the run: unrelated actions still execute, while later-stage
//! actions triggered by the same dataset are skipped instead of building
//! against a stale prerequisite. The manifest advances only when every
//! action succeeded, so a failed or interrupted run re-plans the identical
//! pending work next time.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::classify::DatasetPatterns;
use crate::config::Config;
use crate::graph::DependencyGraph;
use crate::manifest::{self, Manifest};
use crate::models::{ActionStatus, RebuildAction, Stage};
use crate::plan::{self, Plan};

/// Run every action in order, updating each action's status in place.
/// Returns the number of failed and skipped actions.
pub fn execute_plan(actions: &mut [RebuildAction], working_dir: &Path) -> (usize, usize) {
    // Earliest stage at which each dataset saw a failure.
    let mut failed_datasets: HashMap<String, Stage> = HashMap::new();
    // Exit disposition of every distinct command spawned this run.
    let mut command_results: HashMap<String, bool> = HashMap::new();

    let total = actions.len();
    for (i, action) in actions.iter_mut().enumerate() {
        println!(
            "[{}/{}] stage {}: {}",
            i + 1,
            total,
            action.stage,
            action.artifact
        );

        let blocked_by: Vec<&String> = action
            .triggered_by
            .iter()
            .filter(|d| {
                failed_datasets
                    .get(d.as_str())
                    .is_some_and(|&s| s < action.stage)
            })
            .collect();
        if !blocked_by.is_empty() {
            action.status = ActionStatus::Skipped;
            println!(
                "    -> skipped (earlier failure in {})",
                blocked_by
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            continue;
        }

        let key = action.command.to_string();
        if let Some(&ok) = command_results.get(&key) {
            // Same builder command already ran for an earlier artifact.
            if ok {
                action.status = ActionStatus::Success;
                println!("    -> success (command already run this cycle)");
            } else {
                action.status = ActionStatus::Failed;
                println!("    -> failed (command already failed this cycle)");
                record_failure(&mut failed_datasets, action);
            }
            continue;
        }

        println!("    $ {}", key);
        let succeeded = spawn_action(action, working_dir);
        command_results.insert(key, succeeded);
        if succeeded {
            action.status = ActionStatus::Success;
            println!("    -> success");
        } else {
            action.status = ActionStatus::Failed;
            record_failure(&mut failed_datasets, action);
        }
    }

    let failed = actions
        .iter()
        .filter(|a| a.status == ActionStatus::Failed)
        .count();
    let skipped = actions
        .iter()
        .filter(|a| a.status == ActionStatus::Skipped)
        .count();
    (failed, skipped)
}

/// Spawn the builder and wait for it. No internal timeout: a long-running
/// builder runs to completion or is terminated externally by the caller.
fn spawn_action(action: &RebuildAction, working_dir: &Path) -> bool {
    let output = Command::new(&action.command.program)
        .args(&action.command.args)
        .current_dir(working_dir)
        .output();

    match output {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            println!(
                "    -> failed (exit code {})",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string())
            );
            let stderr = String::from_utf8_lossy(&output.stderr);
            for line in stderr.lines().rev().take(5).collect::<Vec<_>>().iter().rev() {
                println!("       {}", line);
            }
            false
        }
        Err(e) => {
            println!("    -> failed to spawn: {}", e);
            false
        }
    }
}

fn record_failure(failed_datasets: &mut HashMap<String, Stage>, action: &RebuildAction) {
    for dataset in &action.triggered_by {
        failed_datasets
            .entry(dataset.clone())
            .and_modify(|s| *s = (*s).min(action.stage))
            .or_insert(action.stage);
    }
}

/// `upk execute`: detect, plan, run, and commit the manifest iff every
/// action succeeded. A failed run leaves the baseline untouched, so the
/// next invocation recomputes and retries the same pending change set.
pub fn run_execute(
    config: &Config,
    patterns: &DatasetPatterns,
    graph: &DependencyGraph,
    hash: bool,
    full: bool,
) -> Result<()> {
    let (current, changes, mut plan): (_, _, Plan) = if full {
        let (current, _) = plan::detect_current(config, patterns, hash)?;
        let plan = plan::plan_full(graph, &config.upstream.root);
        (current, None, plan)
    } else {
        let (current, changes) = plan::detect_current(config, patterns, hash)?;
        if !changes.has_changes() {
            println!("No changes detected — nothing to rebuild.");
            return Ok(());
        }
        let plan = plan::plan_rebuild(graph, &changes.by_dataset(), &config.upstream.root);
        (current, Some(changes), plan)
    };

    plan::print_plan(changes.as_ref(), &plan);

    if plan.actions.is_empty() {
        // Changes landed only in datasets with nothing downstream. The
        // baseline still advances so they stop resurfacing every run.
        manifest::save(&config.manifest.path, &Manifest::from_snapshot(&current))?;
        println!("Manifest updated: {}", config.manifest.path.display());
        return Ok(());
    }

    let (failed, skipped) = execute_plan(&mut plan.actions, &config.executor.working_dir);
    let succeeded = plan.actions.len() - failed - skipped;
    println!(
        "rebuild complete: {} succeeded, {} failed, {} skipped",
        succeeded, failed, skipped
    );

    if failed == 0 && skipped == 0 {
        manifest::save(&config.manifest.path, &Manifest::from_snapshot(&current))?;
        println!("Manifest updated: {}", config.manifest.path.display());
        Ok(())
    } else {
        bail!(
            "{} rebuild action(s) failed — manifest not updated; fix and re-run",
            failed + skipped
        );
    }
}

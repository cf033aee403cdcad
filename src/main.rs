//! # upkeep CLI (`upk`)
//!
//! The `upk` binary drives the incremental rebuild engine: detect what
//! changed under the upstream root, plan the minimal set of downstream
//! rebuilds, run them, and advance the baseline manifest on full success.
//!
//! ## Usage
//!
//! ```bash
//! upk --config ./config/upkeep.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `upk plan` | Detect changes and print the rebuild plan; mutates nothing |
//! | `upk execute` | Run the plan; commit the manifest iff everything succeeded |
//! | `upk init` | Record the current upstream tree as the baseline |
//! | `upk status` | Summarize the committed baseline |
//! | `upk datasets` | List dataset patterns and builder coverage |
//!
//! Exit code is 0 on success or "no changes detected"; non-zero when any
//! rebuild action failed or was skipped during an execute run.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use upkeep::{config, datasets, execute, manifest, plan, registry, status};

/// upkeep — incremental change detection and rebuild planning for
/// slowly-changing data pipelines.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file holding the upstream root, the manifest path, and scanner/executor
/// settings. Dataset patterns and the dependency graph are compiled in;
/// extending coverage to a new upstream directory is a deployment-time
/// change.
#[derive(Parser)]
#[command(
    name = "upk",
    about = "upkeep — incremental change detection and rebuild planning",
    version,
    long_about = "upkeep fingerprints a slowly-changing upstream data tree, diffs it against \
    the last committed baseline manifest, and plans the minimal stage-ordered set of downstream \
    rebuilds. The manifest only advances when every rebuild succeeded, so runs are idempotent \
    and safe to retry."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Holds the upstream root, manifest path, scanner include/exclude
    /// globs, and the working directory builder commands run in.
    #[arg(long, global = true, default_value = "./config/upkeep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Detect changes and print the rebuild plan without running anything.
    ///
    /// Never mutates the manifest or any artifact; safe to run repeatedly.
    Plan {
        /// Verify changed candidates by content hash (SHA-256). Slower, but
        /// catches content changes hidden by identical size and mtime, and
        /// clears files that were touched without being modified.
        #[arg(long)]
        hash: bool,

        /// Skip diffing entirely: plan a rebuild of every known dataset.
        #[arg(long)]
        full: bool,
    },

    /// Detect changes, run the rebuild plan, and commit the new baseline.
    ///
    /// Builders run sequentially in pipeline-stage order. A failure skips
    /// later-stage dependents of the failed dataset but not unrelated
    /// actions. The manifest is committed only when every action
    /// succeeded; otherwise the old baseline stays authoritative and the
    /// next run retries the same pending work.
    Execute {
        /// Verify changed candidates by content hash (SHA-256).
        #[arg(long)]
        hash: bool,

        /// Force a complete rebuild of every known dataset.
        #[arg(long)]
        full: bool,
    },

    /// Record the current upstream tree as the baseline without rebuilding.
    ///
    /// Use once to bootstrap the manifest, or after an out-of-band full
    /// rebuild to mark everything up to date.
    Init {
        /// Store a SHA-256 content hash for every file (slow on large
        /// trees; enables precise hash-mode detection later).
        #[arg(long)]
        hash: bool,
    },

    /// Summarize the committed baseline manifest.
    ///
    /// Prints snapshot age, record counts, and a per-dataset breakdown.
    Status,

    /// List dataset patterns and builder coverage.
    ///
    /// Shows every registered path prefix, the dataset it maps to, and
    /// whether that dataset has downstream builders yet.
    Datasets,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let patterns = registry::default_patterns()?;
    let graph = registry::default_graph()?;

    // `datasets` inspects compiled-in configuration only.
    if let Commands::Datasets = cli.command {
        return datasets::list_datasets(&patterns, &graph);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Plan { hash, full } => {
            plan::run_plan(&cfg, &patterns, &graph, hash, full)?;
        }
        Commands::Execute { hash, full } => {
            execute::run_execute(&cfg, &patterns, &graph, hash, full)?;
        }
        Commands::Init { hash } => {
            manifest::run_init(&cfg, &patterns, hash)?;
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
        Commands::Datasets => unreachable!(),
    }

    Ok(())
}

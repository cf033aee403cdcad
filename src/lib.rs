//! # upkeep
//!
//! Incremental change detection and rebuild planning for slowly-changing
//! data pipelines.
//!
//! upkeep watches a large raw-data tree written by an external collector and
//! decides, cheaply, which downstream curated artifacts actually need
//! rebuilding, instead of re-running a full multi-minute rebuild on every
//! invocation. It fingerprints the tree, diffs against the last committed
//! baseline, maps changed files to datasets, expands datasets to the
//! artifacts they feed, and runs the builders in pipeline-stage order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌──────────┐
//! │ Scanner   │──▶│  Change    │──▶│  Planner  │──▶│ Executor │
//! │ (walkdir) │   │  Detector  │   │ (graph)  │   │ (spawn)  │
//! └────┬─────┘   └─────┬──────┘   └──────────┘   └────┬─────┘
//!      │               │                              │
//!      ▼               ▼                              ▼ on full success
//! ┌──────────┐   ┌────────────┐                 ┌──────────┐
//! │Classifier │   │  Manifest  │◀────────────────│  commit  │
//! │(patterns) │   │  (JSON)    │                 └──────────┘
//! └──────────┘   └────────────┘
//! ```
//!
//! The manifest is the only durable state; it advances atomically and only
//! when every planned action succeeded, so the detect → plan → execute
//! cycle is idempotent and safe to retry.
//!
//! ## Quick start
//!
//! ```bash
//! upk init                      # record the current tree as the baseline
//! upk plan                      # what would rebuild, and why
//! upk execute                   # rebuild it; commit the new baseline
//! upk execute --hash            # content-hash verification of candidates
//! upk status                    # how fresh is the baseline
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`scanner`] | Upstream tree walk and fingerprinting |
//! | [`classify`] | Path → dataset classification |
//! | [`manifest`] | Atomic baseline persistence |
//! | [`detect`] | Snapshot diffing |
//! | [`graph`] | Dataset → artifact dependency graph |
//! | [`registry`] | Compiled-in patterns and graph |
//! | [`plan`] | Rebuild planning |
//! | [`execute`] | Sequential plan execution |
//! | [`status`] | Baseline summary report |
//! | [`datasets`] | Registry coverage listing |

pub mod classify;
pub mod config;
pub mod datasets;
pub mod detect;
pub mod execute;
pub mod graph;
pub mod manifest;
pub mod models;
pub mod plan;
pub mod registry;
pub mod scanner;
pub mod status;

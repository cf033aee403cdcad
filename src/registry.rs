//! Compiled-in deployment configuration: the dataset pattern table and the
//! dependency graph for the immigration-data pipeline this engine serves.
//!
//! Extending coverage to a new upstream directory is a deployment-time
//! change: add a pattern entry here and, once a builder exists, a graph
//! entry. Both registries are plain values handed to the scanner and
//! planner at startup.

use anyhow::Result;

use crate::classify::DatasetPatterns;
use crate::graph::DependencyGraph;
use crate::models::{ArtifactSpec, BuildCommand, Stage};

/// Directory prefixes under the upstream root → canonical dataset names.
pub fn default_patterns() -> Result<DatasetPatterns> {
    DatasetPatterns::new(&[
        // Core datasets with downstream builders.
        ("PERM", "PERM"),
        ("LCA", "LCA"),
        ("OEWS", "OEWS"),
        ("Visa_Bulletin", "VISA_BULLETIN"),
        ("Visa_Annual_Reports", "VISA_ISSUANCE"),
        ("Visa_Statistics", "VISA_APPLICATIONS"),
        ("NIV_Statistics", "NIV_ISSUANCE"),
        ("USCIS_IMMIGRATION", "USCIS"),
        ("DHS_Yearbook", "DHS_ADMISSIONS"),
        ("WARN", "WARN"),
        ("Codebooks", "CODEBOOKS"),
        ("Numerical_Limits", "VISA_CEILING"),
        ("Waiting_List", "WAITING_LIST"),
        ("USCIS_H1B_Employer_Hub", "H1B_EMPLOYER_HUB"),
        ("BLS", "BLS_CES"),
        // Tracked, no builder yet.
        ("ACS", "ACS"),
        ("TRAC", "TRAC"),
        // Reference metadata: record layout PDFs used for parser work.
        // Nested LCA/PERM subtrees must not classify as those datasets.
        ("DOL_Record_Layouts", "DOL_RECORD_LAYOUTS"),
        ("DOL_Record_Layouts/LCA", "DOL_RECORD_LAYOUTS"),
        ("DOL_Record_Layouts/PERM", "DOL_RECORD_LAYOUTS"),
    ])
}

fn curate_cmd() -> BuildCommand {
    BuildCommand::new("python3", &["-m", "src.curate.run_curate", "--paths", "configs/paths.yaml"])
}

fn features_cmd() -> BuildCommand {
    BuildCommand::new(
        "python3",
        &["-m", "src.features.run_features", "--paths", "configs/paths.yaml"],
    )
}

fn models_cmd() -> BuildCommand {
    BuildCommand::new("python3", &["-m", "src.models.run_models", "--paths", "configs/paths.yaml"])
}

fn script_cmd(script: &str) -> BuildCommand {
    BuildCommand::new("python3", &[script])
}

/// Dataset → ordered downstream artifacts. Several artifacts appear under
/// more than one dataset (e.g. `soc_demand_metrics.parquet` under both PERM
/// and LCA); the planner emits one action per artifact per run.
pub fn default_graph() -> Result<DependencyGraph> {
    DependencyGraph::new(vec![
        (
            "PERM",
            vec![
                ArtifactSpec::new("fact_perm/", Stage::Curate, curate_cmd()),
                ArtifactSpec::new(
                    "fact_perm_all.parquet",
                    Stage::Curate,
                    script_cmd("scripts/make_presentation_and_snapshot.py"),
                ),
                ArtifactSpec::new(
                    "fact_perm_unique_case/",
                    Stage::Curate,
                    script_cmd("scripts/build_fact_perm_unique_case.py"),
                ),
                ArtifactSpec::new(
                    "dim_employer.parquet",
                    Stage::Curate,
                    script_cmd("scripts/patch_dim_employer_from_fact_perm.py"),
                ),
                ArtifactSpec::new("employer_features.parquet", Stage::Feature, features_cmd()),
                ArtifactSpec::new(
                    "employer_friendliness_scores.parquet",
                    Stage::Model,
                    models_cmd(),
                ),
                ArtifactSpec::new(
                    "employer_friendliness_scores_ml.parquet",
                    Stage::Model,
                    models_cmd(),
                ),
                ArtifactSpec::new(
                    "employer_monthly_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_employer_monthly_metrics.py"),
                ),
                ArtifactSpec::new(
                    "employer_risk_features.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_employer_risk_features.py"),
                ),
                ArtifactSpec::new(
                    "soc_demand_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_soc_demand_metrics.py"),
                ),
                ArtifactSpec::new(
                    "worksite_geo_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_worksite_geo_metrics.py"),
                ),
            ],
        ),
        (
            "LCA",
            vec![
                ArtifactSpec::new("fact_lca/", Stage::Curate, curate_cmd()),
                ArtifactSpec::new(
                    "soc_demand_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_soc_demand_metrics.py"),
                ),
            ],
        ),
        (
            "OEWS",
            vec![
                ArtifactSpec::new("fact_oews/", Stage::Curate, curate_cmd()),
                ArtifactSpec::new(
                    "fact_oews.parquet",
                    Stage::Curate,
                    script_cmd("scripts/make_presentation_and_snapshot.py"),
                ),
                ArtifactSpec::new("salary_benchmarks.parquet", Stage::Feature, features_cmd()),
                ArtifactSpec::new(
                    "worksite_geo_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_worksite_geo_metrics.py"),
                ),
            ],
        ),
        (
            "VISA_BULLETIN",
            vec![
                ArtifactSpec::new("fact_cutoffs/", Stage::Curate, curate_cmd()),
                ArtifactSpec::new(
                    "fact_cutoffs_all.parquet",
                    Stage::Curate,
                    script_cmd("scripts/make_vb_presentation.py"),
                ),
                ArtifactSpec::new("pd_forecasts.parquet", Stage::Model, models_cmd()),
                ArtifactSpec::new(
                    "fact_cutoff_trends.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_fact_cutoff_trends.py"),
                ),
                ArtifactSpec::new(
                    "backlog_estimates.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_backlog_estimates.py"),
                ),
                ArtifactSpec::new(
                    "category_movement_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_category_movement_metrics.py"),
                ),
            ],
        ),
        (
            "VISA_ISSUANCE",
            vec![
                ArtifactSpec::new(
                    "fact_visa_issuance.parquet",
                    Stage::Curate,
                    BuildCommand::new(
                        "python3",
                        &[
                            "scripts/build_fact_visa_issuance.py",
                            "--downloads",
                            "{upstream_root}/Visa_Annual_Reports",
                            "--out",
                            "artifacts/tables/fact_visa_issuance.parquet",
                        ],
                    ),
                ),
                ArtifactSpec::new(
                    "visa_demand_metrics.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_visa_demand_metrics.py"),
                ),
            ],
        ),
        (
            "VISA_APPLICATIONS",
            vec![ArtifactSpec::new(
                "fact_visa_applications.parquet",
                Stage::Curate,
                script_cmd("scripts/build_fact_visa_applications.py"),
            )],
        ),
        (
            "NIV_ISSUANCE",
            vec![ArtifactSpec::new(
                "fact_niv_issuance.parquet",
                Stage::Curate,
                script_cmd("scripts/build_fact_niv_issuance.py"),
            )],
        ),
        (
            "USCIS",
            vec![
                ArtifactSpec::new(
                    "fact_uscis_approvals.parquet",
                    Stage::Curate,
                    BuildCommand::new(
                        "python3",
                        &[
                            "scripts/build_fact_uscis_approvals.py",
                            "--downloads",
                            "{upstream_root}/USCIS_IMMIGRATION",
                            "--out",
                            "artifacts/tables/fact_uscis_approvals.parquet",
                        ],
                    ),
                ),
                ArtifactSpec::new(
                    "processing_times_trends.parquet",
                    Stage::Export,
                    script_cmd("scripts/make_processing_times_trends.py"),
                ),
            ],
        ),
        (
            "DHS_ADMISSIONS",
            vec![ArtifactSpec::new(
                "fact_dhs_admissions.parquet",
                Stage::Curate,
                script_cmd("scripts/build_fact_dhs_admissions.py"),
            )],
        ),
        (
            "WARN",
            vec![ArtifactSpec::new(
                "fact_warn_events.parquet",
                Stage::Curate,
                BuildCommand::new(
                    "python3",
                    &[
                        "scripts/build_fact_warn_events.py",
                        "--downloads",
                        "{upstream_root}/WARN",
                        "--out",
                        "artifacts/tables/fact_warn_events.parquet",
                    ],
                ),
            )],
        ),
        (
            "VISA_CEILING",
            vec![ArtifactSpec::new(
                "dim_visa_ceiling.parquet",
                Stage::Curate,
                curate_cmd(),
            )],
        ),
        (
            "WAITING_LIST",
            vec![ArtifactSpec::new(
                "fact_waiting_list.parquet",
                Stage::Curate,
                BuildCommand::new(
                    "python3",
                    &[
                        "scripts/build_fact_waiting_list.py",
                        "--downloads",
                        "{upstream_root}/DOS_Waiting_List",
                        "--out",
                        "artifacts/tables/fact_waiting_list.parquet",
                    ],
                ),
            )],
        ),
        (
            "CODEBOOKS",
            vec![
                ArtifactSpec::new("dim_country.parquet", Stage::Curate, curate_cmd()),
                ArtifactSpec::new("dim_soc.parquet", Stage::Curate, curate_cmd()),
            ],
        ),
        (
            "H1B_EMPLOYER_HUB",
            // USCIS H-1B Employer Hub, discontinued upstream after FY2023.
            vec![ArtifactSpec::new(
                "fact_h1b_employer_hub.parquet",
                Stage::Curate,
                script_cmd("scripts/build_fact_h1b_employer_hub.py"),
            )
            .with_reason("changes in {dataset} (discontinued source, rows stale-weighted)")],
        ),
        (
            "BLS_CES",
            vec![ArtifactSpec::new(
                "fact_bls_ces.parquet",
                Stage::Curate,
                script_cmd("scripts/build_fact_bls_ces.py"),
            )],
        ),
        // Tracked for completeness; nothing downstream yet. ACS gets a
        // builder once Census publishes the 2025 ACS1 release.
        ("ACS", vec![]),
        ("DOL_RECORD_LAYOUTS", vec![]),
    ])
}

//! Baseline manifest overview.
//!
//! Gives a quick summary of what the committed baseline covers: record
//! counts, tracked bytes, snapshot age, and a per-dataset breakdown. Used
//! by `upk status` for confidence that the baseline is fresh before an
//! execute run.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::manifest;

#[derive(Default)]
struct DatasetStats {
    files: usize,
    bytes: u64,
    hashed: usize,
}

/// Run the status command: load the committed manifest and print a summary.
pub fn run_status(config: &Config) -> Result<()> {
    let manifest = manifest::load_required(&config.manifest.path)?;

    let manifest_size = std::fs::metadata(&config.manifest.path)
        .map(|m| m.len())
        .unwrap_or(0);

    let total_bytes: u64 = manifest.records.iter().map(|r| r.size).sum();

    println!("upkeep — baseline status");
    println!("========================");
    println!();
    println!("  Manifest:     {}", config.manifest.path.display());
    println!("  Size:         {}", format_bytes(manifest_size));
    println!("  Format:       v{}", manifest.format_version);
    println!(
        "  Snapshot:     {} ({})",
        manifest.snapshot_time.format("%Y-%m-%d %H:%M UTC"),
        format_age(manifest.snapshot_time.timestamp())
    );
    println!();
    println!("  Files:        {}", manifest.records.len());
    println!("  Tracked:      {}", format_bytes(total_bytes));

    let mut per_dataset: BTreeMap<String, DatasetStats> = BTreeMap::new();
    for record in &manifest.records {
        let stats = per_dataset.entry(record.dataset.clone()).or_default();
        stats.files += 1;
        stats.bytes += record.size;
        if record.sha256.is_some() {
            stats.hashed += 1;
        }
    }

    if !per_dataset.is_empty() {
        println!();
        println!("  By dataset:");
        println!(
            "  {:<28} {:>6} {:>10} {:>8}",
            "DATASET", "FILES", "BYTES", "HASHED"
        );
        println!("  {}", "-".repeat(56));
        for (dataset, stats) in &per_dataset {
            println!(
                "  {:<28} {:>6} {:>10} {:>8}",
                dataset,
                stats.files,
                format_bytes(stats.bytes),
                stats.hashed
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative age string (e.g. "3 hours ago").
fn format_age(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return "in the future".to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn format_age_buckets() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_age(now), "just now");
        assert_eq!(format_age(now - 120), "2 mins ago");
        assert_eq!(format_age(now - 7200), "2 hours ago");
        assert_eq!(format_age(now - 3 * 86400), "3 days ago");
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Location of the raw-data tree produced by the upstream collector.
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManifestConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
            follow_symlinks: false,
        }
    }
}

/// File extensions the upstream collector is known to produce. Anything
/// else under the root (logs, lock files, scratch output) is ignored.
fn default_include_globs() -> Vec<String> {
    [
        "xlsx", "xls", "csv", "tsv", "txt", "pdf", "zip", "gz", "json", "xml", "html", "htm",
        "parquet", "dat",
    ]
    .iter()
    .map(|ext| format!("**/*.{}", ext))
    .collect()
}

/// Hidden files, everything under hidden directories, and the
/// leading-underscore control files the collector writes for its own
/// bookkeeping.
fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/.*".to_string(),
        "**/.*/**".to_string(),
        "**/_*".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Working directory the builder commands are spawned in.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
        }
    }
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.upstream.root.as_os_str().is_empty() {
        anyhow::bail!("upstream.root must not be empty");
    }

    if config.manifest.path.as_os_str().is_empty() {
        anyhow::bail!("manifest.path must not be empty");
    }

    if config.scanner.include_globs.is_empty() {
        anyhow::bail!("scanner.include_globs must list at least one pattern");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let file = write_config(
            r#"
[upstream]
root = "/data/p1"

[manifest]
path = "artifacts/manifest.json"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.upstream.root, PathBuf::from("/data/p1"));
        assert!(!config.scanner.follow_symlinks);
        assert!(config
            .scanner
            .include_globs
            .contains(&"**/*.xlsx".to_string()));
        assert!(config.scanner.exclude_globs.contains(&"**/_*".to_string()));
        assert_eq!(config.executor.working_dir, PathBuf::from("."));
    }

    #[test]
    fn empty_root_rejected() {
        let file = write_config(
            r#"
[upstream]
root = ""

[manifest]
path = "m.json"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn empty_include_globs_rejected() {
        let file = write_config(
            r#"
[upstream]
root = "/data"

[manifest]
path = "m.json"

[scanner]
include_globs = []
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_error() {
        assert!(load_config(Path::new("/nonexistent/upkeep.toml")).is_err());
    }
}

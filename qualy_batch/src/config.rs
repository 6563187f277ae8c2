use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minisector::ComparisonConfig;

const CONFIG_FILE: &str = "qualy.json";

pub fn load(explicit: Option<&Path>) -> Result<ComparisonConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_config_path() {
            Some(path) => path,
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                return Ok(ComparisonConfig::default());
            }
        },
    };
    let config = ComparisonConfig::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::info!("loaded config {}", path.display());
    Ok(config)
}

/// Prefer the working directory, then `config/`, then next to the executable.
fn resolve_config_path() -> Option<PathBuf> {
    let mut candidates = vec![
        PathBuf::from(CONFIG_FILE),
        PathBuf::from("config").join(CONFIG_FILE),
    ];
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        exe.push(CONFIG_FILE);
        candidates.push(exe);
    }
    candidates.into_iter().find(|c| c.exists())
}

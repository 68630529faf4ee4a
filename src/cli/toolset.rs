//! Toolset resolution for `--toolset`.
//!
//! A toolset is a JSON file listing the tool names to enable:
//!
//! ```json
//! { "tools": ["list_tables", "describe_table"] }
//! ```
//!
//! Specifications are either file paths or toolset names. Names are searched
//! in order:
//! 1. `./.mssql-schema-mcp/toolset/{name}.json`
//! 2. `{config_dir}/mssql-schema-mcp/toolset/{name}.json`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

const APP_DIR: &str = "mssql-schema-mcp";

/// Toolset configuration loaded from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsetConfig {
    /// List of individual tool names to enable
    pub tools: Vec<String>,
}

fn looks_like_path(spec: &str) -> bool {
    let path = Path::new(spec);
    path.is_absolute()
        || spec.contains('/')
        || spec.contains(MAIN_SEPARATOR)
        || spec.starts_with('.')
        || path.extension().is_some()
}

/// Standard locations for a named toolset, in search order.
fn candidate_paths(name: &str) -> Vec<PathBuf> {
    let file = format!("{name}.json");
    let mut candidates = vec![PathBuf::from(format!(".{APP_DIR}")).join("toolset").join(&file)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(APP_DIR).join("toolset").join(&file));
    }
    candidates
}

/// Resolve toolset specification to a file path
///
/// - "readonly" → searches standard locations
/// - "/abs/path.json" or "./rel.json" → used directly
pub async fn resolve_toolset_path(spec: &str) -> Result<PathBuf> {
    if looks_like_path(spec) {
        let path = PathBuf::from(spec);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            bail!("Toolset file not found: {}", path.display());
        }
        return Ok(path);
    }

    for candidate in candidate_paths(spec) {
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Ok(candidate);
        }
    }

    let searched: Vec<String> = candidate_paths(spec)
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    bail!(
        "Toolset '{}' not found. Searched: {}",
        spec,
        searched.join(", ")
    )
}

/// Load toolset JSON file and extract tool names
pub async fn load_toolset_file(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read toolset file: {}", path.display()))?;

    let toolset: ToolsetConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse toolset file: {}", path.display()))?;

    Ok(toolset.tools)
}

//! Convenience helpers shared across command handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use posrec::{ConvertOptions, Table};
use serde::Serialize;

/// Read a layout or input table, attaching path context to any error.
pub fn load_table(path: &Path) -> Result<Table> {
    Table::from_path(path).with_context(|| format!("failed to read table {}", path.display()))
}

/// Load options from `--config` or start from defaults.
pub fn load_options(config: Option<&Path>) -> Result<ConvertOptions> {
    match config {
        Some(path) => ConvertOptions::load(path),
        None => Ok(ConvertOptions::default()),
    }
}

/// Persist a value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

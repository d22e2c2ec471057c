//! `--config` file handling.

use anyhow::{Context, Result};
use mb_core::ExportConfig;
use std::path::Path;

/// Load an `ExportConfig` from a TOML file. Missing keys keep their defaults.
pub fn load(path: Option<&Path>) -> Result<ExportConfig> {
    let Some(path) = path else {
        return Ok(ExportConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse(text: &str) -> Result<ExportConfig> {
    Ok(toml::from_str(text)?)
}

//! Export pipeline: template → HTML, MJML or canonical JSON.
//!
//! One entry point consumed by the editor store, the WASM bridge and the
//! `mailblocks` CLI.

use crate::html::to_html;
use crate::mjml::to_mjml;
use crate::model::Template;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Config ───────────────────────────────────────────────────────────────

/// Configuration shared by the HTML and MJML exporters.
///
/// Every field has a default, so a partial TOML file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// HTML `<title>`. Default: **"Email"**.
    pub title: String,

    /// Upper edge of the tablet media query, in px. Default: **768**.
    pub tablet_breakpoint: u32,

    /// Upper edge of the mobile media query, in px. Default: **480**.
    pub mobile_breakpoint: u32,

    /// `<mj-body width>` in px. Default: **650**.
    pub body_width: u32,

    /// Font stack for `<mj-all>` and the HTML body. Default: **Arial, Helvetica, sans-serif**.
    pub font_family: String,

    /// Columns take the full row under the mobile breakpoint. Default: **true**.
    pub stack_columns_on_mobile: bool,

    /// Mark each section with an HTML comment. Default: **false**.
    pub include_comments: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Email".to_string(),
            tablet_breakpoint: 768,
            mobile_breakpoint: 480,
            body_width: 650,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            stack_columns_on_mobile: true,
            include_comments: false,
        }
    }
}

// ─── Formats ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Html,
    Mjml,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Mjml => "mjml",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ExportFormat::Html),
            "mjml" => Ok(ExportFormat::Mjml),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format `{other}` (expected html, mjml or json)")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ─── Pipeline ─────────────────────────────────────────────────────────────

/// Serialize a whole template in the requested format.
#[must_use]
pub fn export(template: &Template, format: ExportFormat, config: &ExportConfig) -> String {
    log::debug!("exporting {} elements as {format}", template.element_count());
    match format {
        ExportFormat::Html => to_html(template, config),
        ExportFormat::Mjml => to_mjml(template, config),
        ExportFormat::Json => template.to_json_string(),
    }
}

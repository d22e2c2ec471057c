pub mod css;
pub mod export;
pub mod html;
pub mod id;
pub mod json;
pub mod lint;
pub mod mjml;
pub mod model;
pub mod style;
pub mod value;
pub mod widgets;

pub use css::{StyleSheet, collect_css, collect_styles};
pub use export::{ExportConfig, ExportFormat, export};
pub use html::{render_html, to_html};
pub use id::{ElementId, ElementKey};
pub use json::ImportError;
pub use lint::{LintDiagnostic, LintSeverity, lint_json, lint_template};
pub use mjml::{render_mjml, to_mjml};
pub use model::*;
pub use style::{Device, StyleMap, StyleRecord, StyleValue};
pub use widgets::BlockKind;

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;

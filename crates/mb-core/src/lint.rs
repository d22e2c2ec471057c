//! Lint diagnostics for templates.
//!
//! Reports structural issues without modifying the document. Results feed the
//! `mailblocks lint` command and the editor's layers panel.

use crate::id::ElementId;
use crate::model::{ElementKind, Template};
use crate::widgets::BlockKind;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Allowed drift of a row's column widths from 100%.
const WIDTH_TOLERANCE: f64 = 0.5;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// Should be fixed, likely a mistake.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic for an element.
#[derive(Debug, Clone, Serialize)]
pub struct LintDiagnostic {
    /// The element this diagnostic refers to.
    pub element_id: ElementId,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "empty-section").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all structural rules over a template.
#[must_use]
pub fn lint_template(template: &Template) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_nesting(template, &mut diags);
    lint_column_widths(template, &mut diags);
    lint_empty_sections(template, &mut diags);
    lint_blocks(template, &mut diags);
    diags
}

/// Lint raw Document JSON. Duplicate IDs can only be seen here, because
/// import re-mints them.
#[must_use]
pub fn lint_json(value: &Value) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_duplicate_ids(value, &mut HashSet::new(), &mut diags);
    diags.extend(lint_template(&Template::from_json(value)));
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn lint_duplicate_ids(value: &Value, seen: &mut HashSet<String>, diags: &mut Vec<LintDiagnostic>) {
    if let Some(id) = value.get("id").and_then(Value::as_str)
        && !seen.insert(id.to_string())
    {
        diags.push(LintDiagnostic {
            element_id: ElementId::intern(id),
            message: format!("Duplicate id `{id}`; the copy will get a new id on import."),
            severity: LintSeverity::Warning,
            rule: "duplicate-id",
        });
    }
    if let Some(Value::Array(children)) = value.get("children") {
        for child in children {
            lint_duplicate_ids(child, seen, diags);
        }
    }
}

/// Warn when an element sits under a parent kind the editor never produces.
fn lint_nesting(template: &Template, diags: &mut Vec<LintDiagnostic>) {
    for (idx, _) in template.walk() {
        let Some(element) = template.element_at(idx) else {
            continue;
        };
        for child in template.children(idx) {
            let Some(child) = template.element_at(*child) else {
                continue;
            };
            if !element.kind().accepts(child.kind()) {
                diags.push(LintDiagnostic {
                    element_id: child.id(),
                    message: format!(
                        "{} `{}` cannot be placed inside {} `{}`.",
                        child.kind().name(),
                        child.id(),
                        element.kind().name(),
                        element.id()
                    ),
                    severity: LintSeverity::Warning,
                    rule: "invalid-nesting",
                });
            }
        }
    }
}

/// Warn when the columns of one row do not add up to 100%.
fn lint_column_widths(template: &Template, diags: &mut Vec<LintDiagnostic>) {
    for (idx, _) in template.walk() {
        let Some(row) = template.element_at(idx) else {
            continue;
        };
        if !matches!(row.kind(), ElementKind::Section | ElementKind::InnerSection) {
            continue;
        }
        let widths: Vec<f64> = template
            .children(idx)
            .iter()
            .filter_map(|c| template.element_at(*c).and_then(|e| e.width()))
            .collect();
        if widths.is_empty() {
            continue;
        }
        let total: f64 = widths.iter().sum();
        if (total - 100.0).abs() > WIDTH_TOLERANCE {
            diags.push(LintDiagnostic {
                element_id: row.id(),
                message: format!(
                    "Columns of `{}` add up to {}% instead of 100%.",
                    row.id(),
                    crate::value::format_num(total)
                ),
                severity: LintSeverity::Warning,
                rule: "column-width-sum",
            });
        }
    }
}

/// Info when a section has no blocks anywhere below it.
fn lint_empty_sections(template: &Template, diags: &mut Vec<LintDiagnostic>) {
    for section in template.children_of(template.root_id()) {
        let has_block = template
            .descendants(section)
            .iter()
            .any(|id| template.get(*id).is_some_and(|e| e.kind().is_block()));
        if !has_block {
            diags.push(LintDiagnostic {
                element_id: section,
                message: format!("Section `{section}` contains no blocks."),
                severity: LintSeverity::Info,
                rule: "empty-section",
            });
        }
    }
}

fn lint_blocks(template: &Template, diags: &mut Vec<LintDiagnostic>) {
    for (idx, _) in template.walk() {
        let Some(element) = template.element_at(idx) else {
            continue;
        };
        match element.kind().block_kind() {
            Some(BlockKind::Unknown(name)) => diags.push(LintDiagnostic {
                element_id: element.id(),
                message: format!(
                    "Block `{}` has unknown type `{name}` and exports as an empty placeholder.",
                    element.id()
                ),
                severity: LintSeverity::Warning,
                rule: "unknown-block",
            }),
            Some(BlockKind::Image) if element.data_str("src").is_none() => {
                diags.push(LintDiagnostic {
                    element_id: element.id(),
                    message: format!("Image `{}` has no `src`.", element.id()),
                    severity: LintSeverity::Warning,
                    rule: "missing-image-src",
                });
            }
            _ => {}
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

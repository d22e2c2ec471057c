use crate::input;
use anyhow::Result;
use clap::Args;
use mb_core::{LintDiagnostic, LintSeverity, lint_json};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Args)]
pub struct LintArgs {
    /// Template JSON file
    pub file: PathBuf,

    /// Exit with status 1 if any warning is reported
    #[arg(long)]
    pub deny_warnings: bool,

    /// Print diagnostics as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn lint(args: LintArgs) -> Result<ExitCode> {
    let document = input::read_document(&args.file)?;
    let diags = lint_json(&document);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diags)?);
    } else {
        for diag in &diags {
            println!("{}", format_diagnostic(diag));
        }
        let warnings = count_warnings(&diags);
        eprintln!(
            "{}: {} warning(s), {} note(s)",
            args.file.display(),
            warnings,
            diags.len() - warnings
        );
    }

    if args.deny_warnings && count_warnings(&diags) > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn count_warnings(diags: &[LintDiagnostic]) -> usize {
    diags
        .iter()
        .filter(|d| d.severity == LintSeverity::Warning)
        .count()
}

fn format_diagnostic(diag: &LintDiagnostic) -> String {
    let level = match diag.severity {
        LintSeverity::Warning => "warning",
        LintSeverity::Info => "info",
    };
    format!("{level}[{}] {}: {}", diag.rule, diag.element_id, diag.message)
}

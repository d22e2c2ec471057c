mod commands;
mod config;
mod input;

use clap::{Parser, Subcommand};
use commands::{ExportArgs, LintArgs, export, lint};
use std::process::ExitCode;

/// Mailblocks CLI: export and lint email templates
#[derive(Parser, Debug)]
#[command(name = "mailblocks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a template to HTML, MJML or canonical JSON
    Export(ExportArgs),

    /// Report structural problems in a template
    Lint(LintArgs),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Export(args) => export(args).map(|()| ExitCode::SUCCESS),
        Command::Lint(args) => lint(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

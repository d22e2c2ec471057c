use crate::{config, input};
use anyhow::{Context, Result, anyhow};
use clap::Args;
use mb_core::{ExportFormat, Template};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Template JSON file
    pub file: PathBuf,

    /// Output format (html, mjml, json). Inferred from --out when omitted
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// TOML file with export settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overrides the config's HTML title
    #[arg(long)]
    pub title: Option<String>,

    /// Keep columns side by side on small screens
    #[arg(long)]
    pub no_stack: bool,
}

pub fn export(args: ExportArgs) -> Result<()> {
    let mut config = config::load(args.config.as_deref())?;
    if let Some(title) = args.title {
        config.title = title;
    }
    if args.no_stack {
        config.stack_columns_on_mobile = false;
    }

    let format = resolve_format(args.format.as_deref(), args.out.as_deref())?;
    let document = input::read_document(&args.file)?;
    let template = Template::from_json(&document);
    log::info!(
        "exporting {} ({} elements) as {format}",
        args.file.display(),
        template.element_count()
    );

    let output = mb_core::export(&template, format, &config);
    match args.out {
        Some(path) => std::fs::write(&path, output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{output}"),
    }
    Ok(())
}

fn resolve_format(flag: Option<&str>, out: Option<&Path>) -> Result<ExportFormat> {
    if let Some(flag) = flag {
        return flag.parse().map_err(|e: String| anyhow!(e));
    }
    let inferred = out
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok());
    Ok(inferred.unwrap_or_default())
}

mod export;
mod lint;

pub use export::{ExportArgs, export};
pub use lint::{LintArgs, lint};

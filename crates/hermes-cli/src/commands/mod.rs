//! CLI subcommand argument definitions and implementations for Hermes.
pub mod run;

use std::path::PathBuf;

use clap::Args;

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the product catalog CSV
    pub products_source: PathBuf,

    /// Path to the customer emails CSV
    pub emails_source: PathBuf,

    /// Directory the output CSVs and per-email YAML results are written to
    #[arg(long, default_value = "./output")]
    pub out_dir: PathBuf,

    /// Maximum number of emails to process (0 = use the configured limit, no override)
    #[arg(long, default_value = "0")]
    pub limit: u32,

    /// Process only these email ids (repeatable, or comma-separated in one flag)
    #[arg(long = "email-id", value_delimiter = ',')]
    pub email_ids: Vec<String>,

    /// Spreadsheet id to publish results to (spreadsheet I/O is not implemented;
    /// accepted for CLI-surface compatibility and surfaced via a warning)
    #[arg(long)]
    pub output_gsheet_id: Option<String>,

    /// Abort enqueueing further emails as soon as one fails (in-flight emails still finish)
    #[arg(long)]
    pub stop_on_error: bool,

    /// Bound on concurrently-running workflows
    #[arg(long, default_value_t = hermes_core::batch::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

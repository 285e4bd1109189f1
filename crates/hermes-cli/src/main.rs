//! Hermes CLI - customer-service email agent pipeline.
//!
//! Entry point for the `hermes` binary. Parses CLI arguments, initializes
//! logging, and dispatches to subcommand handlers.
mod commands;

use clap::Parser;
use hermes_core::config::Config;
use tracing_subscriber::EnvFilter;

/// Customer-service email agent pipeline
#[derive(Parser)]
#[command(name = "hermes")]
#[command(version)]
#[command(about = "Classify, resolve, and respond to customer-service emails")]
#[command(after_help = "\
Quick start:
  hermes run products.csv emails.csv   — process a batch of emails")]
struct Cli {
    /// Path to config.toml
    #[arg(short = 'c', long, global = true, default_value = "~/.hermes/config.toml")]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the agent pipeline over a batch of emails
    Run(commands::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing-subscriber.
    //
    // Priority: RUST_LOG env var > --verbose/--quiet flags > default (warn).
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("hermes=debug,hermes_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("hermes=info,hermes_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    let config = Config::load(Some(&cli.config)).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {e}\n\
             Hint: create a config.toml, or pass -c to point at one."
        )
    })?;

    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("{error}");
        }
        anyhow::bail!("configuration is invalid ({} error(s)); see above", errors.len());
    }

    match cli.command {
        Commands::Run(args) => commands::run::execute(&config, args).await,
    }
}

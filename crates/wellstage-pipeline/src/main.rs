//! Wellstage - full-refresh staging loader

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use wellstage_common::logging::{init_logging, LogConfig, LogLevel};
use wellstage_pipeline::catalog::Catalog;
use wellstage_pipeline::config::Settings;
use wellstage_pipeline::pipeline::{Pipeline, RunStatus, SourceSelection};

/// Exit code for a run that completed but silently dropped data.
const EXIT_DEGRADED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "wellstage")]
#[command(author, version, about = "Full-refresh loader for the well-production staging schema")]
struct Cli {
    /// Which sources feed this run
    #[arg(long, value_enum, default_value = "all")]
    source: SourceArg,

    /// Directory of CSV exports (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Files,
    Api,
    All,
}

impl From<SourceArg> for SourceSelection {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Files => SourceSelection::Files,
            SourceArg::Api => SourceSelection::Api,
            SourceArg::All => SourceSelection::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    let mut settings = Settings::load()?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    info!(source = ?cli.source, "starting wellstage run");

    let pool = settings.database.connect().await?;
    let pipeline = Pipeline::new(settings, Catalog::staging(), pool);
    let summary = pipeline.run(cli.source.into()).await?;

    if summary.status == RunStatus::Degraded {
        warn!(
            slices_failed = summary.slices_failed,
            sources_dropped = summary.sources_dropped,
            "run completed with dropped data"
        );
        std::process::exit(EXIT_DEGRADED);
    }

    info!("run completed cleanly");
    Ok(())
}

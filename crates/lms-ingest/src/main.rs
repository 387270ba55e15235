//! LMS Load - assignment extract loader

use anyhow::Result;
use clap::Parser;
use lms_common::logging::init_logging;
use lms_ingest::cli::Cli;
use lms_ingest::{DynamoStore, IngestError, Ingestor, Reporter, SpinnerReporter, StoreConfig, TracingReporter};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Exit status for an abort that is safe to re-run as-is (EX_TEMPFAIL)
const EXIT_RETRY_SAFE: u8 = 75;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = cli.log_config(|key| std::env::var(key).ok());
    let _guard = match log_config.and_then(|config| init_logging(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<IngestError>() {
            Some(ingest) if ingest.is_retry_safe() => ExitCode::from(EXIT_RETRY_SAFE),
            Some(_) => ExitCode::FAILURE,
            None => {
                error!("{e:#}");
                ExitCode::FAILURE
            },
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Started");

    let mut store_config = StoreConfig::from_env()?;
    if let Some(table) = &cli.table {
        store_config = store_config.with_table_name(table);
    }
    store_config.validate()?;

    let ingest_config = cli.ingest_config();
    ingest_config.validate()?;

    let store = DynamoStore::connect(&store_config).await;

    let reporter: Box<dyn Reporter> = if !cli.debug && std::io::stderr().is_terminal() {
        Box::new(SpinnerReporter::new("Loading"))
    } else {
        Box::new(TracingReporter)
    };

    let mut ingestor = Ingestor::new(Arc::new(store), ingest_config, reporter);
    ingestor.run_path(&cli.file).await?;

    Ok(())
}

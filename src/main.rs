//! esdump — bulk index export to rotated CSV files
//!
//! A run-to-completion batch job: connects to the store, opens a scroll
//! over one index, and streams every document into size-rotated CSV files
//! with a fixed column schema.
//!
//! # Usage
//!
//! ```bash
//! esdump https://es.internal:9200 -i 'events-*' \
//!     --schema id,user.name,payload.kind --preserve signals \
//!     -o events --target-size-mb 100
//! ```

use tracing::Level;

use esdump::cli::CliInterface;
use esdump::connection::ConnectionManager;
use esdump::error::Result;
use esdump::export::{
    ExportCoordinator, FlattenOptions, HttpScrollSource, RotatingCsvWriter,
};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands (version, config)
/// 4. Run the export to completion
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    cli.config().validate()?;
    cli.print_banner();

    run_export(&cli).await
}

/// Run one export to completion.
async fn run_export(cli: &CliInterface) -> Result<()> {
    let config = cli.config();

    let mut manager = ConnectionManager::new(config.connection.clone());
    let session = manager.connect().await?;

    let source = HttpScrollSource::new(session, &config.export.index, config.export.page_size);
    let writer = RotatingCsvWriter::new(
        &config.export.output_prefix,
        config.export.schema.clone(),
        config.export.target_size_bytes(),
    );
    let flatten_options = FlattenOptions::new(
        config.export.preserve_fields.clone(),
        config.export.key_separator.clone(),
    );

    let mut coordinator = ExportCoordinator::new(Box::new(source), writer, flatten_options)
        .with_progress(config.export.progress_every, cli.progress_bar_enabled());

    let summary = coordinator.run().await?;

    if !cli.args().quiet {
        println!(
            "Exported {} documents into {} files in {:.2}s ({} dropped)",
            summary.documents_processed,
            summary.files_written,
            summary.elapsed_ms as f64 / 1000.0,
            summary.documents_dropped
        );
    }
    Ok(())
}

/// Initialize logging based on verbosity level.
fn initialize_logging(cli: &CliInterface) {
    let level = if cli.args().very_verbose {
        Level::TRACE
    } else if cli.args().verbose {
        Level::DEBUG
    } else if cli.args().quiet {
        Level::WARN
    } else {
        cli.config().logging.level.to_tracing_level()
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

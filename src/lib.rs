//! esdump library
//!
//! Core functionality for exporting the full contents of an Elasticsearch
//! index into a sequence of size-rotated CSV files. Usable as a library to
//! embed the export pipeline in other tools.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: Store connection management
//! - `error`: Error types and handling
//! - `export`: The scroll → flatten → rotating-CSV pipeline
//!
//! # Example
//!
//! ```no_run
//! use esdump::config::Config;
//! use esdump::connection::ConnectionManager;
//! use esdump::export::{
//!     ExportCoordinator, FlattenOptions, HttpScrollSource, RotatingCsvWriter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.export.index = "events".to_string();
//!     config.export.schema = vec!["id".to_string(), "user.name".to_string()];
//!
//!     let session = ConnectionManager::new(config.connection.clone())
//!         .connect()
//!         .await?;
//!     let source = HttpScrollSource::new(session, &config.export.index, 1000);
//!     let writer = RotatingCsvWriter::new(
//!         &config.export.output_prefix,
//!         config.export.schema.clone(),
//!         config.export.target_size_bytes(),
//!     );
//!     let mut coordinator = ExportCoordinator::new(
//!         Box::new(source),
//!         writer,
//!         FlattenOptions::default(),
//!     );
//!     let summary = coordinator.run().await?;
//!     println!("{} documents exported", summary.documents_processed);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;

// Re-export commonly used types
pub use config::Config;
pub use connection::{ConnectionManager, EsSession};
pub use error::{EsdumpError, Result};
pub use export::{ExportCoordinator, ExportSummary, HttpScrollSource, RotatingCsvWriter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}

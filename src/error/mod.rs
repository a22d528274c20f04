//! Error handling module for export operations.
//!
//! This module provides error handling for the export pipeline with:
//! - Structured error information extraction from Elasticsearch responses
//! - A single crate-wide error type wrapping specific kinds
//! - A clear fatal/non-fatal taxonomy
//!
//! Only connection, query, and cursor-expiry errors abort a run. Write and
//! close failures are logged where they occur and never propagate, trading
//! exact completeness for maximal partial output.

pub mod es;
pub mod kinds;

// Re-export commonly used types
pub use es::{classify_open_error, classify_scroll_error, EsErrorBody};
pub use kinds::{
    ConfigError, ConnectionError, EsdumpError, ExportError, QueryError, Result,
};

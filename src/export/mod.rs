//! Streaming export pipeline
//!
//! This module exports the full contents of an index into a sequence of
//! size-bounded CSV files:
//!
//! 1. **ScrollSource**: pulls raw document batches through the store's
//!    cursor protocol, one open scroll per run
//! 2. **flatten**: promotes one level of nested structure into dotted-style
//!    flat keys
//! 3. **RotatingCsvWriter**: appends rows against a fixed schema and rolls
//!    over to the next numbered file on a byte threshold
//! 4. **ExportCoordinator**: drives the loop, tracks progress, and releases
//!    the scroll context on every exit path
//!
//! The flow is strictly sequential: one cursor, one writer, one thread of
//! control.

pub mod coordinator;
pub mod flatten;
pub mod progress;
pub mod scroll;
pub mod writer;

pub use coordinator::{ExportCoordinator, ExportState, ExportSummary};
pub use flatten::{flatten, FlatRecord, FlattenOptions};
pub use progress::ProgressTracker;
pub use scroll::{HttpScrollSource, RawDocument, ScrollOpen, ScrollSource};
pub use writer::RotatingCsvWriter;

//! Progress reporting for long-running exports
//!
//! Wraps an optional progress bar (bounded when the store supplied a hit
//! estimate, a spinner otherwise) and keeps the counters the periodic log
//! lines and the final summary are built from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker for an export run
pub struct ProgressTracker {
    /// Documents processed so far
    processed: AtomicU64,
    /// Start of the run
    started: Instant,
    /// Progress bar, absent when running non-interactively
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a tracker.
    ///
    /// `total` is the store's hit estimate at open time; it only shapes the
    /// bar, never the run's termination.
    pub fn new(total: Option<u64>, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = match total {
                Some(n) => {
                    let bar = ProgressBar::new(n);
                    bar.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                            .unwrap()
                            .progress_chars("#>-"),
                    );
                    bar
                }
                None => {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(
                        ProgressStyle::default_spinner()
                            .template("{spinner:.green} {pos} documents {msg}")
                            .unwrap(),
                    );
                    bar
                }
            };
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            started: Instant::now(),
            bar,
        }
    }

    /// Record the running document count.
    pub fn update(&self, count: u64) {
        self.processed.store(count, Ordering::Relaxed);

        if let Some(ref bar) = self.bar {
            bar.set_position(count);
            let elapsed = self.started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("({:.0} docs/sec)", count as f64 / elapsed));
            }
        }
    }

    /// Documents processed so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Clear the bar, leaving the terminal clean for the summary line.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts_without_bar() {
        let tracker = ProgressTracker::new(Some(1000), false);
        tracker.update(500);
        assert_eq!(tracker.processed(), 500);
    }

    #[test]
    fn test_tracker_without_total() {
        let tracker = ProgressTracker::new(None, false);
        tracker.update(42);
        assert_eq!(tracker.processed(), 42);
        tracker.finish();
    }
}

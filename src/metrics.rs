// Run metrics
//
// Lightweight counters for one installer run, logged when the run ends

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters collected by the sequencer.
///
/// Atomic so they can be updated through `&self` while the sequencer is borrowed.
#[derive(Debug)]
pub struct Metrics {
    /// Components whose install routine succeeded
    pub components_succeeded: AtomicUsize,

    /// Components whose install routine failed
    pub components_failed: AtomicUsize,

    /// Components skipped (dry run, unhandled id, aborted run)
    pub components_skipped: AtomicUsize,

    /// Total time spent inside install routines in milliseconds
    pub total_install_time_ms: AtomicU64,

    /// Number of progress updates emitted
    pub progress_updates: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            components_succeeded: AtomicUsize::new(0),
            components_failed: AtomicUsize::new(0),
            components_skipped: AtomicUsize::new(0),
            total_install_time_ms: AtomicU64::new(0),
            progress_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_succeeded(&self) {
        self.components_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.components_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.components_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time spent in one install routine
    pub fn record_install_time(&self, duration: Duration) {
        self.total_install_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_progress_update(&self) {
        self.progress_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average install time per attempted component in milliseconds
    pub fn avg_install_time_ms(&self) -> f64 {
        let total = self.total_install_time_ms.load(Ordering::Relaxed);
        let count = self.components_succeeded.load(Ordering::Relaxed)
            + self.components_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Run Metrics ===");
        tracing::info!("Elapsed: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Components: {} succeeded, {} failed, {} skipped",
            self.components_succeeded.load(Ordering::Relaxed),
            self.components_failed.load(Ordering::Relaxed),
            self.components_skipped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Install time: {:.2}s (avg: {:.0}ms per component), progress updates: {}",
            self.total_install_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_install_time_ms(),
            self.progress_updates.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

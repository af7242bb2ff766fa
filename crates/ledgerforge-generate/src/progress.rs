use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tracing::info;

/// Tracks and logs completion/failure counts for a batch of homogeneous
/// operations.
#[derive(Debug)]
pub struct ProgressReporter {
    label: String,
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
    log_every: usize,
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            label: label.into(),
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
            log_every: (total / 10).max(1),
        }
    }

    pub fn success(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.log_every == 0 || done == self.total {
            info!(
                batch = %self.label,
                done,
                total = self.total,
                failed = self.failed.load(Ordering::Relaxed),
                "progress"
            );
        }
    }

    pub fn failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Log the final tally with timing.
    pub fn finish(&self) {
        info!(
            batch = %self.label,
            succeeded = self.completed(),
            failed = self.failed(),
            total = self.total,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "batch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_failures() {
        let progress = ProgressReporter::new("accounts", 5);
        progress.success();
        progress.success();
        progress.failure();
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.failed(), 1);
    }
}

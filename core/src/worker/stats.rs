//! Worker statistics tracking

use std::time::{Duration, Instant};

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Operations that passed verification
    pub completed: usize,

    /// Operations that failed (at most one per worker)
    pub failed: usize,

    /// Iterations that found nothing to do
    pub idle: usize,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Attempted operations (completed + failed)
    pub fn total_ops(&self) -> usize {
        self.completed + self.failed
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Attempted operations per second
    pub fn ops_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.total_ops() as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Record a verified operation
    pub fn record_completed(&mut self) {
        self.completed += 1;
    }

    /// Record a failed operation
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Record an iteration with nothing to do
    pub fn record_idle(&mut self) {
        self.idle += 1;
    }

    /// Merge stats from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.idle += other.idle;
    }
}

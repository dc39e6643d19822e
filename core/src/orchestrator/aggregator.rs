//! Result aggregation from multiple workers

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::worker::WorkerStats;

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    /// Number of workers that ran
    pub total_workers: usize,

    /// Total verified operations
    pub total_completed: usize,

    /// Total failed operations
    pub total_failed: usize,

    /// Total iterations that found nothing to do
    pub total_idle: usize,

    /// Maximum duration across all workers
    #[serde(rename = "elapsed_secs", serialize_with = "duration_secs")]
    pub total_duration: Duration,

    /// Overall attempted operations per second
    pub ops_per_second: f64,
}

impl AggregatedStats {
    /// Get the total number of attempted operations (completed + failed)
    pub fn total_ops(&self) -> usize {
        self.total_completed + self.total_failed
    }
}

fn duration_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut merged = WorkerStats::new();
    for s in stats {
        merged.merge(s);
    }

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let ops_per_second = if secs > 0.0 {
        merged.total_ops() as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        total_completed: merged.completed,
        total_failed: merged.failed,
        total_idle: merged.idle,
        total_duration,
        ops_per_second,
    }
}

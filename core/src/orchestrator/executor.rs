//! Orchestrator execution logic

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use crate::allocator::ObjectAllocator;
use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::stop::StopFlag;
use crate::storage::Bucket;
use crate::worker::{Budget, OpKind, RunningWorker, WorkerBuilder, WorkerOutcome, WorkerStats};

use super::aggregator::{aggregate_worker_stats, AggregatedStats};
use super::builder::WorkerSpec;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Orchestrator manages one load run
///
/// Spawns every worker on its own thread, joins them in creation order and
/// reports what they left behind.
pub struct Orchestrator {
    /// CLI access (shared across workers)
    pub(crate) ctx: Arc<HarnessContext>,

    /// Worker groups, in spawn order
    pub(crate) specs: Vec<WorkerSpec>,

    /// Shared bucket list
    pub(crate) buckets: Option<Arc<Vec<Bucket>>>,

    /// Shared object allocator
    pub(crate) allocator: Option<Arc<ObjectAllocator>>,

    /// Run-wide stop flag
    pub(crate) stop: StopFlag,

    /// Whether to draw a progress bar
    pub(crate) progress: bool,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        ctx: Arc<HarnessContext>,
        specs: Vec<WorkerSpec>,
        buckets: Option<Arc<Vec<Bucket>>>,
        allocator: Option<Arc<ObjectAllocator>>,
        progress: bool,
    ) -> Self {
        Self {
            ctx,
            specs,
            buckets,
            allocator,
            stop: StopFlag::new(),
            progress,
        }
    }

    /// Ask every worker of the current run to stop after its current operation
    ///
    /// Only a run in progress is affected: [`Orchestrator::run`] lowers the
    /// flag when it starts, so a stop issued before that is discarded.
    pub fn stop(&self) {
        self.stop.raise();
    }

    /// Handle for stopping the run from another thread
    ///
    /// Raising it before [`Orchestrator::run`] has started has no effect on
    /// that run; see [`Orchestrator::stop`].
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Total number of workers
    pub fn worker_count(&self) -> usize {
        self.specs.iter().map(|spec| spec.count).sum()
    }

    /// Total operation budget
    ///
    /// `None` if any worker is unbounded or the total does not fit in a `u64`.
    pub fn total_budget(&self) -> Option<u64> {
        self.specs.iter().try_fold(0u64, |total, spec| match spec.budget {
            Budget::Limited(n) => n
                .checked_mul(u64::try_from(spec.count).ok()?)
                .and_then(|ops| total.checked_add(ops)),
            Budget::Unbounded => None,
        })
    }

    /// Run every worker to completion
    ///
    /// The stop flag is lowered first, so a previous run's failure does not
    /// leak into this one. If a worker thread cannot be started, the workers
    /// already running are stopped and joined before the error is returned.
    pub fn run(&self) -> HarnessResult<LoadReport> {
        self.stop.reset();
        let start = Instant::now();
        let progress = self.progress_bar();

        tracing::info!(
            workers = self.worker_count(),
            specs = ?self.specs,
            "Starting load run"
        );

        let mut running = Vec::with_capacity(self.worker_count());
        let mut start_error = None;
        let mut per_kind: HashMap<OpKind, usize> = HashMap::new();

        'spawn: for spec in &self.specs {
            for _ in 0..spec.count {
                let idx = per_kind.entry(spec.kind).or_default();
                let name = format!("{}-{idx}", spec.kind.as_str());
                *idx += 1;

                match self.start_worker(name, spec, progress.as_ref()) {
                    Ok(worker) => running.push(worker),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to start worker, stopping run");
                        self.stop.raise();
                        start_error = Some(e);
                        break 'spawn;
                    }
                }
            }
        }

        // Join in creation order
        let outcomes: Vec<WorkerOutcome> = running.into_iter().map(RunningWorker::join).collect();

        if let Some(progress) = progress {
            progress.finish();
        }
        if let Some(e) = start_error {
            return Err(e);
        }

        let worker_stats: Vec<WorkerStats> = outcomes.iter().map(|o| o.stats.clone()).collect();
        let stats = aggregate_worker_stats(&worker_stats);
        let report = LoadReport { outcomes, stats };

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            total_completed = report.stats.total_completed,
            failed_workers = report.failed_workers(),
            ops = report.stats.ops_per_second,
            "Load run completed"
        );

        Ok(report)
    }

    fn start_worker(
        &self,
        name: String,
        spec: &WorkerSpec,
        progress: Option<&ProgressBar>,
    ) -> HarnessResult<RunningWorker> {
        let mut builder = WorkerBuilder::new(name, spec.kind)
            .context(Arc::clone(&self.ctx))
            .budget(spec.budget)
            .stop_flag(self.stop.clone());

        if let Some(buckets) = &self.buckets {
            builder = builder.buckets(Arc::clone(buckets));
        }
        if let Some(allocator) = &self.allocator {
            builder = builder.allocator(Arc::clone(allocator));
        }
        if let Some(progress) = progress {
            builder = builder.progress(progress.clone());
        }

        builder.build()?.start()
    }

    pub(crate) fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let total = self.total_budget()?;
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("specs", &self.specs)
            .field("buckets", &self.buckets)
            .field("stopped", &self.stop.is_raised())
            .finish()
    }
}

/// Everything a load run produced
#[derive(Debug)]
pub struct LoadReport {
    /// One outcome per worker, in creation order
    pub outcomes: Vec<WorkerOutcome>,
    /// Aggregated counters
    pub stats: AggregatedStats,
}

impl LoadReport {
    /// Error of the first worker, in creation order, that recorded one
    ///
    /// This is not necessarily the failure that happened first in time.
    pub fn first_error(&self) -> Option<&HarnessError> {
        self.outcomes.iter().find_map(WorkerOutcome::error)
    }

    /// Owned form of [`LoadReport::first_error`]
    pub fn into_first_error(self) -> Option<HarnessError> {
        self.outcomes
            .into_iter()
            .find_map(WorkerOutcome::into_error)
    }

    /// Number of workers that recorded an error
    pub fn failed_workers(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }

    /// Whether no worker recorded an error
    pub fn is_ok(&self) -> bool {
        self.failed_workers() == 0
    }
}

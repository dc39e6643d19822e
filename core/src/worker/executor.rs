//! Worker execution loop

use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::stop::StopFlag;

use super::operation::{Budget, OpKind, Operation, Step};
use super::stats::WorkerStats;

use indicatif::ProgressBar;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// LoadWorker repeats one operation: check stop -> execute -> account -> repeat
///
/// Workers run on their own OS thread and block on every CLI call. The only
/// state they share with other workers is the stop flag and, for DELETE, the
/// object allocator.
pub struct LoadWorker {
    /// Unique worker name
    name: String,

    /// Operation kind
    kind: OpKind,

    /// Remaining operations
    budget: Budget,

    /// CLI access (shared across workers via Arc)
    ctx: Arc<HarnessContext>,

    /// Resolved operation
    operation: Operation,

    /// Run-wide stop flag
    stop: StopFlag,

    /// Shared progress bar
    progress: Option<ProgressBar>,
}

impl LoadWorker {
    pub(crate) fn new(
        name: String,
        kind: OpKind,
        budget: Budget,
        ctx: Arc<HarnessContext>,
        operation: Operation,
        stop: StopFlag,
        progress: Option<ProgressBar>,
    ) -> Self {
        Self {
            name,
            kind,
            budget,
            ctx,
            operation,
            stop,
            progress,
        }
    }

    /// Worker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operation kind
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Run the loop on the calling thread
    ///
    /// Stops when the budget is spent, the stop flag is raised or there is
    /// nothing to do. The first failure is kept and raises the stop flag for
    /// every other worker sharing it.
    pub fn run(mut self) -> WorkerOutcome {
        let mut stats = WorkerStats::new();
        let mut error = None;
        stats.start();

        tracing::debug!(
            worker = %self.name,
            kind = %self.kind,
            budget = ?self.budget.remaining(),
            "Worker started"
        );

        while !self.stop.is_raised() && self.budget.has_remaining() {
            match self.operation.execute(&self.ctx, &self.name) {
                Ok(Step::Performed) => {
                    self.budget.consume();
                    stats.record_completed();
                    if let Some(progress) = &self.progress {
                        progress.inc(1);
                    }
                }
                Ok(Step::Idle) => {
                    stats.record_idle();
                    tracing::debug!(worker = %self.name, "Nothing to do, worker stopping");
                    break;
                }
                Err(e) => {
                    self.budget.consume();
                    stats.record_failure();
                    tracing::warn!(
                        worker = %self.name,
                        error = %e,
                        "Operation failed, stopping all workers"
                    );
                    self.stop.raise();
                    error = Some(e);
                    break;
                }
            }
        }

        stats.stop();
        tracing::debug!(
            worker = %self.name,
            completed = stats.completed,
            failed = stats.failed,
            ops_per_second = stats.ops_per_second(),
            stopped = self.stop.is_raised(),
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        WorkerOutcome {
            name: self.name,
            kind: self.kind,
            stats,
            error,
        }
    }

    /// Run the loop on a new named thread
    pub fn start(self) -> HarnessResult<RunningWorker> {
        let name = self.name.clone();
        let kind = self.kind;
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())?;
        Ok(RunningWorker { name, kind, handle })
    }
}

impl std::fmt::Debug for LoadWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadWorker")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("budget", &self.budget)
            .field("operation", &self.operation)
            .finish()
    }
}

/// A worker running on its own thread
#[derive(Debug)]
pub struct RunningWorker {
    name: String,
    kind: OpKind,
    handle: JoinHandle<WorkerOutcome>,
}

impl RunningWorker {
    /// Worker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the worker returns
    ///
    /// A panicked worker yields an outcome carrying
    /// [`HarnessError::WorkerPanicked`].
    pub fn join(self) -> WorkerOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(worker = %self.name, "Worker panicked");
                WorkerOutcome {
                    error: Some(HarnessError::WorkerPanicked(self.name.clone())),
                    name: self.name,
                    kind: self.kind,
                    stats: WorkerStats::default(),
                }
            }
        }
    }
}

/// What a finished worker leaves behind
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Worker name
    pub name: String,
    /// Operation kind
    pub kind: OpKind,
    /// Counters and timing
    pub stats: WorkerStats,
    error: Option<HarnessError>,
}

impl WorkerOutcome {
    /// The failure that stopped this worker, if any
    pub fn error(&self) -> Option<&HarnessError> {
        self.error.as_ref()
    }

    /// Take the failure out
    pub fn into_error(self) -> Option<HarnessError> {
        self.error
    }

    /// Whether the worker finished without a failure
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use crate::allocator::ObjectAllocator;
use crate::config::ConfigError;
use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::storage::Bucket;
use crate::worker::{Budget, OpKind};

use super::executor::Orchestrator;

/// How many workers of one kind to run, and their budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Operation kind
    pub kind: OpKind,
    /// Number of workers
    pub count: usize,
    /// Per-worker budget
    pub budget: Budget,
}

impl WorkerSpec {
    /// `count` workers of `kind`, each with `budget`
    pub fn new(kind: OpKind, count: usize, budget: Budget) -> Self {
        Self {
            kind,
            count,
            budget,
        }
    }
}

/// Builder for creating an Orchestrator
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .context(ctx)
///     .spawn(WorkerSpec::new(OpKind::Delete, 100, Budget::Limited(50)))
///     .buckets(vec![bucket])
///     .allocator(allocator)
///     .build()?;
///
/// let report = orchestrator.run()?;
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    context: Option<Arc<HarnessContext>>,
    specs: Vec<WorkerSpec>,
    buckets: Option<Arc<Vec<Bucket>>>,
    allocator: Option<Arc<ObjectAllocator>>,
    progress: bool,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the harness context
    pub fn context(mut self, ctx: Arc<HarnessContext>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Add a group of workers
    pub fn spawn(mut self, spec: WorkerSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Share a bucket list with every worker
    pub fn buckets(mut self, buckets: Vec<Bucket>) -> Self {
        self.buckets = Some(Arc::new(buckets));
        self
    }

    /// Share an object allocator with every worker
    pub fn allocator(mut self, allocator: Arc<ObjectAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Show a progress bar when the total budget is finite
    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the context is not set or no worker is requested.
    pub fn build(self) -> HarnessResult<Orchestrator> {
        let ctx = self
            .context
            .ok_or_else(|| HarnessError::missing_config("context"))?;

        if self.specs.iter().all(|spec| spec.count == 0) {
            return Err(ConfigError::InvalidLoad("at least one worker is required".into()).into());
        }

        Ok(Orchestrator::new(
            ctx,
            self.specs,
            self.buckets,
            self.allocator,
            self.progress,
        ))
    }
}

//! Builder pattern for LoadWorker construction

use crate::allocator::ObjectAllocator;
use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::stop::StopFlag;
use crate::storage::Bucket;

use super::executor::LoadWorker;
use super::operation::{Budget, OpKind, Operation};

use indicatif::ProgressBar;
use std::sync::Arc;

/// Builder for creating LoadWorker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new("del-0", OpKind::Delete)
///     .context(ctx)
///     .budget(Budget::Limited(50))
///     .buckets(buckets)
///     .allocator(allocator)
///     .stop_flag(stop.clone())
///     .build()?;
///
/// let outcome = worker.start()?.join();
/// ```
pub struct WorkerBuilder {
    name: String,
    kind: OpKind,
    context: Option<Arc<HarnessContext>>,
    budget: Option<Budget>,
    buckets: Option<Arc<Vec<Bucket>>>,
    allocator: Option<Arc<ObjectAllocator>>,
    stop: Option<StopFlag>,
    progress: Option<ProgressBar>,
}

impl WorkerBuilder {
    /// Create a new builder for a named worker
    pub fn new(name: impl Into<String>, kind: OpKind) -> Self {
        Self {
            name: name.into(),
            kind,
            context: None,
            budget: None,
            buckets: None,
            allocator: None,
            stop: None,
            progress: None,
        }
    }

    /// Set the harness context
    pub fn context(mut self, ctx: Arc<HarnessContext>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Set the operation budget
    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Set the shared bucket list (GET and DELETE)
    pub fn buckets(mut self, buckets: Arc<Vec<Bucket>>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    /// Set the shared object allocator (DELETE)
    pub fn allocator(mut self, allocator: Arc<ObjectAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Set the run-wide stop flag; a private flag is used otherwise
    pub fn stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Advance this bar once per completed operation
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the LoadWorker
    ///
    /// # Errors
    /// Returns an error if the context or budget is missing.
    pub fn build(self) -> HarnessResult<LoadWorker> {
        let ctx = self
            .context
            .ok_or(HarnessError::missing_config("context"))?;
        let budget = self.budget.ok_or(HarnessError::missing_config("budget"))?;

        let operation = Operation::resolve(self.kind, &self.name, &ctx, self.buckets, self.allocator);

        Ok(LoadWorker::new(
            self.name,
            self.kind,
            budget,
            ctx,
            operation,
            self.stop.unwrap_or_default(),
            self.progress,
        ))
    }
}

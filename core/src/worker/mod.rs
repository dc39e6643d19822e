//! Load worker module
//!
//! A LoadWorker is one OS thread running a simple loop:
//! **check stop flag -> execute one operation -> account -> repeat**.
//!
//! The operation (PUT, GET or DELETE) is resolved once when the worker is
//! built. Each iteration is a single blocking CLI invocation verified by the
//! engine. The loop ends when:
//!
//! 1. the operation budget is spent,
//! 2. the shared stop flag is raised (by another worker's failure or by the
//!    orchestrator), or
//! 3. the operation has nothing to work on (GET/DELETE without buckets or
//!    objects).
//!
//! A failed operation is recorded on the worker and raises the stop flag;
//! it never unwinds across the thread boundary.
//!
//! # Example
//!
//! ```ignore
//! use s3harness_core::worker::{Budget, OpKind, WorkerBuilder};
//!
//! let worker = WorkerBuilder::new("put-0", OpKind::Put)
//!     .context(ctx)
//!     .budget(Budget::Limited(100))
//!     .build()?;
//!
//! let outcome = worker.start()?.join();
//! println!("Completed: {}", outcome.stats.completed);
//! ```

mod builder;
mod executor;
mod operation;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::{LoadWorker, RunningWorker, WorkerOutcome};
pub use operation::{Budget, OpKind, Step};
pub use stats::WorkerStats;

#[cfg(test)]
mod tests;

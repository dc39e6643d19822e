//! Orchestrator for load-run lifecycle management
//!
//! The Orchestrator coordinates one load run:
//! - Spawning one thread per worker, wired to the shared bucket list and
//!   object allocator
//! - Owning the run-wide stop flag (lowered at the start of every run)
//! - Joining workers in creation order and reporting the first error
//!
//! # Example
//!
//! ```ignore
//! use s3harness_core::{Budget, OpKind, OrchestratorBuilder, WorkerSpec};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .context(ctx)
//!     .spawn(WorkerSpec::new(OpKind::Put, 10, Budget::Limited(20)))
//!     .build()?;
//!
//! let report = orchestrator.run()?;
//! if let Some(err) = report.first_error() { /* ... */ }
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, AggregatedStats};
pub use builder::{OrchestratorBuilder, WorkerSpec};
pub use executor::{LoadReport, Orchestrator};

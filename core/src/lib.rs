//! s3harness-core: Verification engine and load workers for s3cmd-style CLIs
//!
//! This crate provides the building blocks the harness binary drives,
//! including:
//!
//! - Subprocess execution with merged output capture
//! - Pattern-based verification of exit codes and output
//! - Console reporting of passes, failures and skips
//! - Test buckets, objects and generated fixture files
//! - Concurrent PUT/GET/DELETE load workers and their orchestrator
//! - Configuration and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fixture;
pub mod orchestrator;
pub mod pattern;
pub mod process;
pub mod reporter;
pub mod stop;
pub mod storage;
pub mod verify;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use allocator::ObjectAllocator;
pub use client::CliInvoker;
pub use config::{CliConfig, ConfigError, HarnessConfig, LoadConfig};
pub use context::HarnessContext;
pub use error::*;
pub use fixture::{FixtureSet, SizeClass};
pub use orchestrator::{
    aggregate_worker_stats, AggregatedStats, LoadReport, Orchestrator, OrchestratorBuilder,
    WorkerSpec,
};
pub use pattern::PatternSet;
pub use process::{CommandRunner, ExecutionResult, Invocation, StdinSource, SubprocessRunner};
pub use reporter::{ReportCounts, TestReporter};
pub use stop::StopFlag;
pub use storage::{Bucket, ObjectRef};
pub use verify::{FailureReason, VerificationEngine, VerificationFailure, VerificationOutcome};
pub use worker::{Budget, OpKind, WorkerBuilder, WorkerOutcome, WorkerStats};

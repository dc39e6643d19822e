//! Integration tests for the Worker module

use super::*;
use crate::allocator::ObjectAllocator;
use crate::error::HarnessError;
use crate::exit_codes::EX_NOTFOUND;
use crate::process::ExecutionResult;
use crate::stop::StopFlag;
use crate::storage::Bucket;
use crate::testing::{fixture_context, s3_echo, MockRunner};

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Helpers
// ============================================================================

fn shared_buckets() -> Arc<Vec<Bucket>> {
    Arc::new(vec![Bucket::from_suffix("test-", "shared")])
}

/// Fails the `n`th `del` call (1-based) with EX_NOTFOUND
fn failing_delete_on(n: usize) -> MockRunner {
    let deletes = AtomicUsize::new(0);
    MockRunner::from_fn(move |inv| {
        if inv.args()[1] == "del" && deletes.fetch_add(1, Ordering::SeqCst) + 1 == n {
            return Ok(ExecutionResult::new(EX_NOTFOUND, "ERROR: not found"));
        }
        Ok(s3_echo(inv))
    })
}

fn subcommands(runner: &MockRunner, name: &str) -> usize {
    runner.seen().iter().filter(|args| args[1] == name).count()
}

// ============================================================================
// PUT
// ============================================================================

#[test]
fn test_put_worker_spends_budget() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());

    let outcome = WorkerBuilder::new("put-0", OpKind::Put)
        .context(ctx)
        .budget(Budget::Limited(5))
        .build()
        .unwrap()
        .run();

    assert!(outcome.is_ok());
    assert_eq!(outcome.stats.completed, 5);
    assert_eq!(subcommands(&runner, "put"), 5);
    // bucket created once, lazily
    assert_eq!(subcommands(&runner, "mb"), 1);
}

#[test]
fn test_put_worker_names_objects_after_itself() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());

    WorkerBuilder::new("put-3", OpKind::Put)
        .context(ctx)
        .budget(Budget::Limited(2))
        .build()
        .unwrap()
        .run();

    let dests: Vec<String> = runner
        .seen()
        .iter()
        .filter(|args| args[1] == "put")
        .map(|args| args.last().cloned().unwrap())
        .collect();
    assert_eq!(
        dests,
        [
            "s3://test-put-3/put-3-0_1KB.bin",
            "s3://test-put-3/put-3-1_1KB.bin"
        ]
    );
}

#[test]
fn test_put_worker_stops_when_bucket_is_not_listed() {
    // mb succeeds but the stateless echo never lists the bucket
    let (ctx, runner, _tmp) = fixture_context(MockRunner::from_fn(|inv| Ok(s3_echo(inv))));

    let outcome = WorkerBuilder::new("put-0", OpKind::Put)
        .context(ctx)
        .budget(Budget::Limited(5))
        .build()
        .unwrap()
        .run();

    assert!(matches!(
        outcome.error(),
        Some(HarnessError::BucketNotListed(name)) if name == "s3://test-put-0"
    ));
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(subcommands(&runner, "mb"), 1);
    assert_eq!(subcommands(&runner, "put"), 0);
}

// ============================================================================
// GET / DELETE without work
// ============================================================================

#[test]
fn test_get_without_buckets_is_noop() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());

    let outcome = WorkerBuilder::new("get-0", OpKind::Get)
        .context(ctx)
        .budget(Budget::Limited(10))
        .build()
        .unwrap()
        .run();

    assert!(outcome.is_ok());
    assert_eq!(outcome.stats.total_ops(), 0);
    assert_eq!(outcome.stats.idle, 1);
    assert_eq!(runner.calls(), 0);
}

#[test]
fn test_delete_without_allocator_is_noop() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());

    let outcome = WorkerBuilder::new("del-0", OpKind::Delete)
        .context(ctx)
        .budget(Budget::Unbounded)
        .buckets(shared_buckets())
        .build()
        .unwrap()
        .run();

    assert!(outcome.is_ok());
    assert_eq!(outcome.stats.total_ops(), 0);
    assert_eq!(runner.calls(), 0);
}

#[test]
fn test_delete_with_empty_population_is_noop() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());
    let allocator = Arc::new(ObjectAllocator::new(shared_buckets().to_vec(), 0));

    let outcome = WorkerBuilder::new("del-0", OpKind::Delete)
        .context(ctx)
        .budget(Budget::Limited(3))
        .buckets(shared_buckets())
        .allocator(allocator)
        .build()
        .unwrap()
        .run();

    assert!(outcome.is_ok());
    assert_eq!(runner.calls(), 0);
}

// ============================================================================
// GET / DELETE with work
// ============================================================================

#[test]
fn test_get_worker_downloads_from_shared_buckets() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());

    let outcome = WorkerBuilder::new("get-1", OpKind::Get)
        .context(ctx.clone())
        .budget(Budget::Limited(3))
        .buckets(shared_buckets())
        .build()
        .unwrap()
        .run();

    assert!(outcome.is_ok());
    assert_eq!(outcome.stats.completed, 3);
    for args in runner.seen() {
        assert_eq!(args[1], "get");
        assert_eq!(args[2], "s3://test-shared/_1KB.bin");
        assert!(args[3].ends_with("get-1-_1KB.bin"));
        assert_eq!(args[4], "--force");
    }
}

#[test]
fn test_delete_worker_walks_allocator() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());
    let allocator = Arc::new(ObjectAllocator::new(shared_buckets().to_vec(), 10));

    let outcome = WorkerBuilder::new("del-0", OpKind::Delete)
        .context(ctx)
        .budget(Budget::Limited(10))
        .buckets(shared_buckets())
        .allocator(allocator)
        .build()
        .unwrap()
        .run();

    assert_eq!(outcome.stats.completed, 10);
    let deleted: HashSet<String> = runner.seen().into_iter().map(|args| args[2].clone()).collect();
    assert_eq!(deleted.len(), 10);
    assert!(deleted.contains("s3://test-shared/obj-9"));
}

// ============================================================================
// Failure and cancellation
// ============================================================================

#[test]
fn test_failure_is_recorded_and_raises_stop_flag() {
    let (ctx, runner, _tmp) = fixture_context(failing_delete_on(3));
    let allocator = Arc::new(ObjectAllocator::new(shared_buckets().to_vec(), 100));
    let stop = StopFlag::new();

    let outcome = WorkerBuilder::new("del-0", OpKind::Delete)
        .context(ctx)
        .budget(Budget::Limited(10))
        .buckets(shared_buckets())
        .allocator(allocator)
        .stop_flag(stop.clone())
        .build()
        .unwrap()
        .run();

    assert!(stop.is_raised());
    assert_eq!(outcome.stats.completed, 2);
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(runner.calls(), 3);

    let err = outcome.into_error().unwrap();
    assert!(err.is_verification());
    assert_eq!(
        err.as_verification().unwrap().command_line,
        "s3cmd del s3://test-shared/obj-2"
    );
}

#[test]
fn test_raised_stop_flag_prevents_any_iteration() {
    let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());
    let stop = StopFlag::new();
    stop.raise();

    let outcome = WorkerBuilder::new("put-0", OpKind::Put)
        .context(ctx)
        .budget(Budget::Unbounded)
        .stop_flag(stop)
        .build()
        .unwrap()
        .run();

    assert!(outcome.is_ok());
    assert_eq!(runner.calls(), 0);
}

#[test]
fn test_unbounded_worker_stops_on_flag() {
    let (ctx, runner, _tmp) =
        fixture_context(MockRunner::echo().with_delay(Duration::from_millis(2)));
    let stop = StopFlag::new();

    let running = WorkerBuilder::new("get-0", OpKind::Get)
        .context(ctx)
        .budget(Budget::Unbounded)
        .buckets(shared_buckets())
        .stop_flag(stop.clone())
        .build()
        .unwrap()
        .start()
        .unwrap();

    std::thread::sleep(Duration::from_millis(50));
    stop.raise();
    let outcome = running.join();

    assert!(outcome.is_ok());
    assert!(outcome.stats.completed > 0);
    // an in-flight call may finish after the flag, none start after it
    let calls_at_join = runner.calls();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(runner.calls(), calls_at_join);
}

#[test]
fn test_started_worker_thread_is_named() {
    let (ctx, _runner, _tmp) = fixture_context(MockRunner::from_fn(|inv| {
        assert_eq!(std::thread::current().name(), Some("get-7"));
        Ok(s3_echo(inv))
    }));

    let running = WorkerBuilder::new("get-7", OpKind::Get)
        .context(ctx)
        .budget(Budget::Limited(1))
        .buckets(shared_buckets())
        .build()
        .unwrap()
        .start()
        .unwrap();

    assert_eq!(running.name(), "get-7");
    let outcome = running.join();
    assert!(outcome.is_ok());
    assert_eq!(outcome.kind, OpKind::Get);
}

#[test]
fn test_panicking_worker_is_reported() {
    let (ctx, _runner, _tmp) = fixture_context(MockRunner::from_fn(|_| panic!("runner blew up")));

    let outcome = WorkerBuilder::new("get-0", OpKind::Get)
        .context(ctx)
        .budget(Budget::Limited(1))
        .buckets(shared_buckets())
        .build()
        .unwrap()
        .start()
        .unwrap()
        .join();

    assert!(matches!(outcome.error(), Some(HarnessError::WorkerPanicked(name)) if name == "get-0"));
}

//! Test doubles shared by the unit tests of this crate

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::config::HarnessConfig;
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::process::{CommandRunner, ExecutionResult, Invocation};

type Handler = dyn Fn(&Invocation) -> HarnessResult<ExecutionResult> + Send + Sync;

/// Scripted [`CommandRunner`] that records every call
pub struct MockRunner {
    handler: Box<Handler>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    /// Answer every invocation with the same exit code and output
    pub fn replying(exit_code: i32, output: &str) -> Self {
        let output = output.to_string();
        Self::from_fn(move |_| Ok(ExecutionResult::new(exit_code, output.clone())))
    }

    /// Answer like a healthy endpoint that keeps track of its buckets
    pub fn echo() -> Self {
        let endpoint = EchoEndpoint::default();
        Self::from_fn(move |inv| Ok(endpoint.answer(inv)))
    }

    /// Answer with a closure over the invocation
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&Invocation) -> HarnessResult<ExecutionResult> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of invocations run
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Argument vectors of every invocation, in call order
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ExecutionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(invocation.args().to_vec());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        (self.handler)(invocation)
    }
}

/// Context over a mock runner with a `s3cmd` CLI and a `test-` bucket prefix
pub fn test_context(runner: MockRunner) -> (Arc<HarnessContext>, Arc<MockRunner>) {
    let runner = Arc::new(runner);
    let config = HarnessConfig::default().with_bucket_prefix("test-");
    let ctx = HarnessContext::with_runner(&config, runner.clone());
    (Arc::new(ctx), runner)
}

/// Successful CLI output for the commands load workers issue
///
/// Mirrors the lines the real CLI prints, so the workers' patterns match.
pub fn s3_echo(invocation: &Invocation) -> ExecutionResult {
    let args = invocation.args();
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let last = args.last().cloned().unwrap_or_default();
    let output = match arg(1).as_str() {
        "mb" => format!("Bucket '{}/' created", arg(2)),
        "put" => format!("upload: 'local' -> '{last}'  [1 of 1]"),
        "get" => format!("download: '{}' -> '{}'  [1 of 1]", arg(2), arg(3)),
        "del" => format!("delete: '{}'", arg(2)),
        _ => String::new(),
    };
    ExecutionResult::new(crate::exit_codes::EX_OK, output)
}

/// [`s3_echo`] plus a bucket list, so `ls` shows what `mb` created
#[derive(Default)]
pub struct EchoEndpoint {
    buckets: Mutex<BTreeSet<String>>,
}

impl EchoEndpoint {
    /// Answer one invocation, updating the bucket list
    pub fn answer(&self, invocation: &Invocation) -> ExecutionResult {
        let args = invocation.args();
        let url = args.last().cloned().unwrap_or_default();
        let mut buckets = self.buckets.lock().unwrap();
        match args.get(1).map(String::as_str) {
            Some("mb") => {
                buckets.insert(url);
            }
            Some("rb") => {
                buckets.remove(&url);
            }
            Some("ls") if args.len() == 2 => {
                let listing: String = buckets
                    .iter()
                    .map(|bucket| format!("2024-01-01 00:00  {bucket}\n"))
                    .collect();
                return ExecutionResult::new(crate::exit_codes::EX_OK, listing);
            }
            _ => {}
        }
        s3_echo(invocation)
    }
}

/// Context whose fixture directory holds a generated 1 KiB fixture
pub fn fixture_context(runner: MockRunner) -> (Arc<HarnessContext>, Arc<MockRunner>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(runner);
    let config = HarnessConfig::default()
        .with_bucket_prefix("test-")
        .with_fixture_dir(tmp.path().join("data"))
        .with_download_dir(tmp.path().join("download"))
        .with_fixture_max_bytes(1024);
    let ctx = HarnessContext::with_runner(&config, runner.clone());
    ctx.fixtures().generate().unwrap();
    (Arc::new(ctx), runner, tmp)
}

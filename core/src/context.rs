//! Everything a suite step or load worker needs to talk to the CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::CliInvoker;
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::fixture::FixtureSet;
use crate::pattern::PatternSet;
use crate::process::{CommandRunner, ExecutionResult, Invocation, SubprocessRunner};
use crate::reporter::TestReporter;
use crate::storage::Bucket;
use crate::verify::{VerificationEngine, VerificationOutcome};

/// Shared harness state for one process
///
/// Replaces process-wide globals: the reporter counters live in the engine,
/// naming and paths come from the configuration.
#[derive(Debug, Clone)]
pub struct HarnessContext {
    engine: VerificationEngine,
    cli: CliInvoker,
    bucket_prefix: String,
    fixtures: FixtureSet,
    download_dir: PathBuf,
    out_dir: PathBuf,
}

impl HarnessContext {
    /// Context that runs the CLI as a real subprocess
    pub fn new(config: &HarnessConfig) -> Self {
        Self::with_runner(config, Arc::new(SubprocessRunner::new()))
    }

    /// Context over any command runner
    pub fn with_runner(config: &HarnessConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let reporter = Arc::new(TestReporter::new(config.verbose));
        let fixtures = match config.fixture_max_bytes {
            Some(max) => FixtureSet::new(&config.fixture_dir).with_max_size(max),
            None => FixtureSet::new(&config.fixture_dir),
        };
        Self {
            engine: VerificationEngine::new(runner, reporter),
            cli: CliInvoker::from_config(&config.cli),
            bucket_prefix: config.bucket_prefix.clone(),
            fixtures,
            download_dir: config.download_dir.clone(),
            out_dir: config.out_dir.clone(),
        }
    }

    /// The verification engine
    pub fn engine(&self) -> &VerificationEngine {
        &self.engine
    }

    /// The shared reporter
    pub fn reporter(&self) -> &Arc<TestReporter> {
        self.engine.reporter()
    }

    /// CLI invocation with `args`
    pub fn s3<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cli.invocation(args)
    }

    /// Verify an invocation, failing fast
    pub fn check(
        &self,
        label: Option<&str>,
        invocation: &Invocation,
        patterns: &PatternSet,
    ) -> HarnessResult<VerificationOutcome> {
        self.engine.check(label, invocation, patterns)
    }

    /// Run an invocation without assertions
    pub fn execute(&self, invocation: &Invocation) -> HarnessResult<ExecutionResult> {
        self.engine.execute(invocation)
    }

    /// Test bucket named with the configured prefix
    pub fn bucket(&self, suffix: impl AsRef<str>) -> Bucket {
        Bucket::from_suffix(&self.bucket_prefix, suffix.as_ref())
    }

    /// Prefix shared by every test bucket
    pub fn bucket_prefix(&self) -> &str {
        &self.bucket_prefix
    }

    /// Fixture files
    pub fn fixtures(&self) -> &FixtureSet {
        &self.fixtures
    }

    /// Download destination directory
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Suite scratch directory
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

//! Heavy PUT/GET/DELETE runs through the worker orchestrator

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use console::style;
use s3harness_core::{
    AggregatedStats, Budget, HarnessContext, LoadConfig, LoadReport, ObjectAllocator, OpKind,
    OrchestratorBuilder, WorkerSpec,
};
use serde_json::json;

use super::Suite;

/// Concurrent load against the endpoint, one run per operation kind
pub struct LoadSuite {
    load: LoadConfig,
    json: Option<PathBuf>,
    progress: bool,
}

impl LoadSuite {
    /// Suite sized by `load`
    pub fn new(load: LoadConfig) -> Self {
        Self {
            load,
            json: None,
            progress: true,
        }
    }

    /// Also write the statistics of every run to `path`
    pub fn with_json(mut self, path: Option<PathBuf>) -> Self {
        self.json = path;
        self
    }

    /// Show a progress bar during bounded runs
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    fn orchestrator(&self, ctx: &Arc<HarnessContext>, kind: OpKind) -> Result<OrchestratorBuilder> {
        let budget = Budget::from_count(self.load.ops_per_thread)?;
        Ok(OrchestratorBuilder::new()
            .context(Arc::clone(ctx))
            .spawn(WorkerSpec::new(kind, self.load.threads, budget))
            .progress(self.progress))
    }

    /// Every worker uploads into its own bucket
    fn heavy_put(&self, ctx: &Arc<HarnessContext>) -> Result<LoadReport> {
        Ok(self.orchestrator(ctx, OpKind::Put)?.build()?.run()?)
    }

    /// Every worker downloads fixtures from one shared bucket
    fn heavy_get(&self, ctx: &Arc<HarnessContext>) -> Result<LoadReport> {
        let bucket = ctx.bucket("heavy-get");
        bucket.create(ctx, true)?;
        let fixtures = ctx.fixtures();
        for class in fixtures.classes() {
            bucket.put(ctx, &fixtures.path(class), None)?;
        }

        Ok(self
            .orchestrator(ctx, OpKind::Get)?
            .buckets(vec![bucket])
            .build()?
            .run()?)
    }

    /// Objects to populate for the DELETE run
    ///
    /// A bounded run needs at least `threads * ops_per_thread` objects: once
    /// the allocator wraps, workers delete objects that are already gone and
    /// the run stops on EX_NOTFOUND. An unbounded run ends that way by
    /// construction, after one full pass over `objects`.
    fn delete_population(&self) -> Result<usize> {
        let LoadConfig {
            threads,
            ops_per_thread,
            objects,
        } = self.load;

        match Budget::from_count(ops_per_thread)? {
            Budget::Unbounded if objects == 0 => {
                bail!("an unbounded DELETE run needs an explicit object count")
            }
            Budget::Unbounded => Ok(objects),
            Budget::Limited(ops) => {
                let needed = usize::try_from(ops)
                    .ok()
                    .and_then(|ops| ops.checked_mul(threads))
                    .with_context(|| {
                        format!("{threads} threads x {ops} ops is too many objects to populate")
                    })?;
                if objects == 0 {
                    Ok(needed)
                } else if objects < needed {
                    bail!(
                        "{objects} objects cannot feed {threads} DELETE threads x {ops} ops; \
                         use at least {needed} or leave objects unset"
                    )
                } else {
                    Ok(objects)
                }
            }
        }
    }

    /// Every worker deletes from one pre-populated bucket
    fn heavy_delete(&self, ctx: &Arc<HarnessContext>) -> Result<LoadReport> {
        let population = self.delete_population()?;

        let bucket = ctx.bucket("heavy-del");
        bucket.create(ctx, true)?;
        let allocator = ObjectAllocator::populate(ctx, vec![bucket.clone()], population)?;

        Ok(self
            .orchestrator(ctx, OpKind::Delete)?
            .buckets(vec![bucket])
            .allocator(Arc::new(allocator))
            .build()?
            .run()?)
    }

    fn write_json(&self, path: &Path, runs: &[(&str, AggregatedStats)]) -> Result<()> {
        let output = json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "threads": self.load.threads,
            "ops_per_thread": self.load.ops_per_thread,
            "runs": runs
                .iter()
                .map(|(name, stats)| json!({ "name": name, "stats": stats }))
                .collect::<Vec<_>>(),
        });

        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &output)?;
        tracing::info!(path = %path.display(), "Load statistics written");
        Ok(())
    }
}

impl Suite for LoadSuite {
    fn name(&self) -> &'static str {
        "Load"
    }

    fn run(&self, ctx: &Arc<HarnessContext>) -> Result<()> {
        // reject a DELETE sizing that cannot succeed before any load is generated
        self.delete_population()?;

        let runs: [(&str, fn(&Self, &Arc<HarnessContext>) -> Result<LoadReport>); 3] = [
            ("Heavy PUT", Self::heavy_put),
            ("Heavy GET", Self::heavy_get),
            ("Heavy DELETE", Self::heavy_delete),
        ];

        let mut results = Vec::with_capacity(runs.len());
        for (name, run) in runs {
            let report = run(self, ctx)?;
            let stats = report.stats.clone();
            print_stats(name, &stats);

            // the failing call was reported when it happened
            if let Some(err) = report.into_first_error() {
                return Err(err).with_context(|| format!("{name} stopped on a worker failure"));
            }

            let reporter = ctx.reporter();
            reporter.begin(name);
            reporter.pass(Some(&format!(
                "{} ops, {:.1} ops/s",
                stats.total_completed, stats.ops_per_second
            )));
            results.push((name, stats));
        }

        if let Some(path) = &self.json {
            self.write_json(path, &results)?;
        }
        Ok(())
    }
}

fn print_stats(name: &str, stats: &AggregatedStats) {
    println!();
    println!("{}", style(name).bold());
    println!("  Workers:     {}", stats.total_workers);
    println!("  Completed:   {}", style(stats.total_completed).green());
    if stats.total_failed > 0 {
        println!("  Failed:      {}", style(stats.total_failed).red());
    }
    if stats.total_idle > 0 {
        println!("  Idle:        {}", style(stats.total_idle).yellow());
    }
    println!("  Elapsed:     {:.2}s", stats.total_duration.as_secs_f64());
    println!("  Throughput:  {:.1} ops/s", stats.ops_per_second);
}

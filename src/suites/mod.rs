//! Regression and load suites
//!
//! A suite is a fixed sequence of verified steps. Every step goes through
//! [`HarnessContext::check`], so the first failed step ends the suite (and the
//! run) with its diagnostic already printed.

mod bucket;
mod load;
mod object;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use s3harness_core::pattern::PatternSet;
use s3harness_core::storage::{self, Bucket};
use s3harness_core::HarnessContext;

pub use bucket::BucketSuite;
pub use load::LoadSuite;
pub use object::ObjectSuite;

/// One named group of steps
pub trait Suite {
    /// Name printed in the banners
    fn name(&self) -> &'static str;

    /// Run every step; the first failure is returned
    fn run(&self, ctx: &Arc<HarnessContext>) -> Result<()>;
}

/// Prepare the environment, run `suite`, and frame it with banners
pub fn run(suite: &dyn Suite, ctx: &Arc<HarnessContext>) -> Result<()> {
    let reporter = ctx.reporter();
    reporter.banner(suite.name());
    tracing::debug!(suite = suite.name(), "Suite starting");

    prepare(ctx)?;
    suite.run(ctx)?;

    reporter.end_banner(suite.name());
    Ok(())
}

/// Remove leftover test buckets, regenerate fixtures, reset scratch dirs
fn prepare(ctx: &HarnessContext) -> Result<()> {
    let reporter = ctx.reporter();

    reporter.begin_step("Remove leftover test buckets");
    let removed = storage::remove_all_test_buckets(ctx)?;
    reporter.ok(Some(&format!("{removed} removed")));

    reporter.begin_step("Generate fixture files");
    ctx.fixtures()
        .generate()
        .with_context(|| format!("Failed to write fixtures to {}", ctx.fixtures().dir().display()))?;
    reporter.ok(Some(&format!("{} files", ctx.fixtures().classes().len())));

    for dir in [ctx.out_dir(), ctx.download_dir()] {
        if dir.exists() {
            fs::remove_dir_all(dir)
                .with_context(|| format!("Failed to clear {}", dir.display()))?;
        }
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}

/// Pattern printed by a successful `mb`
pub(crate) fn created(bucket: &Bucket) -> String {
    format!("Bucket '{}/' created", bucket.full_name())
}

/// Pattern printed by a successful `rb`
pub(crate) fn removed(bucket: &Bucket) -> String {
    format!("Bucket '{}/' removed", bucket.full_name())
}

/// Patterns asserting that a listing shows `urls`
pub(crate) fn listed<I>(urls: I) -> PatternSet
where
    I: IntoIterator<Item = String>,
{
    PatternSet::new().must_find_all(urls)
}

//! Bucket create/list/remove steps

use std::sync::Arc;

use anyhow::Result;
use s3harness_core::exit_codes::{EX_CONFLICT, EX_USAGE};
use s3harness_core::pattern::PatternSet;
use s3harness_core::HarnessContext;

use super::{created, listed, removed, Suite};

/// Bucket lifecycle, including the documented failure codes
pub struct BucketSuite;

impl Suite for BucketSuite {
    fn name(&self) -> &'static str {
        "Bucket"
    }

    fn run(&self, ctx: &Arc<HarnessContext>) -> Result<()> {
        let b1 = ctx.bucket("bucket-1");
        let b2 = ctx.bucket("bucket-2");
        let b3 = ctx.bucket("bucket-3");

        ctx.check(
            Some("Create one bucket"),
            &ctx.s3(["mb", &b1.full_name()]),
            &PatternSet::new().must_find(created(&b1)),
        )?;

        ctx.check(
            Some("Create multiple buckets"),
            &ctx.s3(["mb", &b2.full_name(), &b3.full_name()]),
            &PatternSet::new().must_find_all([created(&b2), created(&b3)]),
        )?;

        // upper case is not allowed in bucket names
        let invalid = ctx.bucket("EU");
        ctx.check(
            Some("Create bucket, invalid name"),
            &ctx.s3(["mb", &invalid.full_name()]).accept(EX_USAGE),
            &PatternSet::new()
                .must_find_re(r"(?i)bucket name")
                .must_not_find(created(&invalid)),
        )?;

        ctx.check(
            Some("Create existing bucket"),
            &ctx.s3(["mb", &b2.full_name()]).accept(EX_CONFLICT),
            &PatternSet::new().must_find("ERROR"),
        )?;

        ctx.check(
            Some("List buckets"),
            &ctx.s3(["ls"]),
            &listed([b1.full_name(), b2.full_name(), b3.full_name()]),
        )?;

        ctx.check(
            Some("List all objects"),
            &ctx.s3(["la"]),
            &PatternSet::new().must_not_find("ERROR"),
        )?;

        ctx.check(
            Some("Remove empty bucket"),
            &ctx.s3(["rb", &b1.full_name()]),
            &PatternSet::new().must_find(removed(&b1)),
        )?;

        ctx.check(
            Some("Remove multiple buckets"),
            &ctx.s3(["rb", &b2.full_name(), &b3.full_name()]),
            &PatternSet::new().must_find_all([removed(&b2), removed(&b3)]),
        )?;

        // non-empty bucket: plain rb refuses, recursive rb succeeds
        b1.create(ctx, false)?;
        let fixtures = ctx.fixtures();
        let object = b1.put(ctx, &fixtures.path(&fixtures.classes()[0]), None)?;

        ctx.check(
            Some("Remove non-empty bucket"),
            &ctx.s3(["rb", &b1.full_name()]).accept(EX_CONFLICT),
            &PatternSet::new().must_find("BucketNotEmpty"),
        )?;

        ctx.check(
            Some("Verify object survived"),
            &ctx.s3(["ls", "--recursive", &b1.full_name()]),
            &listed([object.full_name()]),
        )?;

        ctx.check(
            Some("Remove bucket recursively"),
            &ctx.s3(["rb", "--recursive", &b1.full_name()]),
            &PatternSet::new().must_find(removed(&b1)),
        )?;

        ctx.check(
            Some("Verify buckets are gone"),
            &ctx.s3(["ls"]),
            &PatternSet::new().must_not_find(ctx.bucket("bucket-").full_name()),
        )?;

        Ok(())
    }
}

//! Object put/get/list/delete steps

use std::sync::Arc;

use anyhow::Result;
use s3harness_core::exit_codes::EX_NOTFOUND;
use s3harness_core::fixture::MULTIPART_CHUNK_MB;
use s3harness_core::pattern::PatternSet;
use s3harness_core::process::Invocation;
use s3harness_core::storage;
use s3harness_core::HarnessContext;

use super::{listed, Suite};

/// Object uploads and downloads between two test buckets
pub struct ObjectSuite;

impl Suite for ObjectSuite {
    fn name(&self) -> &'static str {
        "Object"
    }

    fn run(&self, ctx: &Arc<HarnessContext>) -> Result<()> {
        let b1 = ctx.bucket("bucket-1");
        let b2 = ctx.bucket("bucket-2");
        b1.create(ctx, true)?;
        b2.create(ctx, true)?;

        let fixtures = ctx.fixtures();
        let classes = fixtures.classes();
        let small = &classes[0];
        let medium = classes.get(1).unwrap_or(small);
        let small_path = fixtures.path(small).display().to_string();
        let medium_path = fixtures.path(medium).display().to_string();

        // ==== put
        let small_url = b1.object_url(small.file_name);
        ctx.check(
            Some("Put object"),
            &ctx.s3(["put", &small_path, &b1.full_name()]),
            &PatternSet::new().must_find(format!("-> '{small_url}'")),
        )?;

        let stdin_url = b1.object_url(&format!("stdin{}", small.file_name));
        ctx.check(
            Some("Put object from stdin"),
            &ctx.s3(["put", "-", &stdin_url]).with_stdin_file(fixtures.path(small)),
            &PatternSet::new().must_find(format!("-> '{stdin_url}'")),
        )?;

        // largest class above the multipart threshold, if one was generated
        let multipart = classes.iter().rev().find(|class| class.needs_multipart());
        let multipart_put = match multipart {
            Some(class) => ctx.s3([
                "put".to_string(),
                format!("--multipart-chunk-size-mb={MULTIPART_CHUNK_MB}"),
                fixtures.path(class).display().to_string(),
                b1.full_name(),
            ]),
            None => Invocation::empty(),
        };
        ctx.check(
            Some("Put multipart object"),
            &multipart_put,
            &PatternSet::new().must_find(format!(
                "-> '{}'",
                b1.object_url(multipart.map_or("", |class| class.file_name))
            )),
        )?;

        ctx.check(
            Some("Put multiple objects"),
            &ctx.s3(["put", &small_path, &medium_path, &b2.full_name()]),
            &PatternSet::new().must_find_all([
                format!("-> '{}'", b2.object_url(small.file_name)),
                format!("-> '{}'", b2.object_url(medium.file_name)),
            ]),
        )?;

        // ==== get and list
        let dest = ctx.out_dir().join(small.file_name).display().to_string();
        ctx.check(
            Some("Get object"),
            &ctx.s3(["get", &small_url, &dest, "--force"]),
            &PatternSet::new().must_find(format!("download: '{small_url}' -> '{dest}'")),
        )?;

        ctx.check(
            Some("List objects recursively"),
            &ctx.s3(["ls", "--recursive", &b1.full_name()]),
            &listed([small_url.clone(), stdin_url.clone()]),
        )?;

        // ==== delete
        ctx.check(
            Some("Delete object"),
            &ctx.s3(["del", &small_url]),
            &PatternSet::new().must_find(format!("delete: '{small_url}'")),
        )?;

        ctx.check(
            Some("Delete missing object"),
            &ctx.s3(["del", &small_url]).accept(EX_NOTFOUND),
            &PatternSet::new().must_not_find(format!("delete: '{small_url}'")),
        )?;

        ctx.check(
            Some("Verify object deleted"),
            &ctx.s3(["ls", "--recursive", &b1.full_name()]),
            &PatternSet::new()
                .must_find(stdin_url)
                .must_not_find(small_url),
        )?;

        // keep the buckets, drop their content
        let cleared = storage::clear_all_test_buckets(ctx)?;
        tracing::debug!(buckets = cleared, "Cleared test buckets");
        ctx.check(
            Some("Verify buckets emptied"),
            &ctx.s3(["la"]),
            &PatternSet::new().must_not_find(format!("{}/", b1.full_name())),
        )?;

        Ok(())
    }
}

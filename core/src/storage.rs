//! Bucket and object handles over the CLI
//!
//! Every operation is one CLI invocation through the context. Queries
//! (`exists`, `contains`, `list`) run unverified and interpret the listing;
//! mutations are verified and fail fast.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::exit_codes::EX_OK;
use crate::fixture::{MULTIPART_CHUNK_MB, MULTIPART_THRESHOLD};
use crate::pattern::PatternSet;

/// URL scheme of bucket and object names
pub const S3_SCHEME: &str = "s3://";

/// A bucket by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bucket {
    name: String,
}

impl Bucket {
    /// Bucket named `prefix` + `suffix`
    pub fn from_suffix(prefix: &str, suffix: &str) -> Self {
        Self {
            name: format!("{prefix}{suffix}"),
        }
    }

    /// Bucket from `s3://name` (a bare name is accepted too)
    pub fn from_full_name(full_name: &str) -> Self {
        let name = full_name.strip_prefix(S3_SCHEME).unwrap_or(full_name);
        Self {
            name: name.trim_end_matches('/').to_string(),
        }
    }

    /// Bare bucket name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `s3://name`
    pub fn full_name(&self) -> String {
        format!("{S3_SCHEME}{}", self.name)
    }

    /// `s3://name/key`
    pub fn object_url(&self, key: &str) -> String {
        format!("{S3_SCHEME}{}/{key}", self.name)
    }

    /// Whether the bucket shows up in the bucket listing
    pub fn exists(&self, ctx: &HarnessContext) -> HarnessResult<bool> {
        let result = ctx.execute(&ctx.s3(["ls"]))?;
        let full = self.full_name();
        Ok(result.exit_code() == EX_OK && listed_urls(result.output()).any(|url| url == full))
    }

    /// Whether the bucket has no objects
    pub fn is_empty(&self, ctx: &HarnessContext) -> HarnessResult<bool> {
        Ok(self.list(ctx)?.is_empty())
    }

    /// Whether an object named `key` is in the bucket
    pub fn contains(&self, ctx: &HarnessContext, key: &str) -> HarnessResult<bool> {
        Ok(self.list(ctx)?.iter().any(|k| k == key))
    }

    /// Object keys in the bucket (recursive listing)
    pub fn list(&self, ctx: &HarnessContext) -> HarnessResult<Vec<String>> {
        let result = ctx.execute(&ctx.s3(["ls", "--recursive", &self.full_name()]))?;
        if result.exit_code() != EX_OK {
            return Ok(Vec::new());
        }
        let prefix = format!("{}/", self.full_name());
        Ok(listed_urls(result.output())
            .filter_map(|url| url.strip_prefix(&prefix))
            .map(str::to_string)
            .collect())
    }

    /// Create the bucket if missing; with `refresh` an existing one is emptied
    ///
    /// Returns whether the bucket exists afterwards.
    pub fn create(&self, ctx: &HarnessContext, refresh: bool) -> HarnessResult<bool> {
        let full = self.full_name();
        if !self.exists(ctx)? {
            ctx.check(
                None,
                &ctx.s3(["mb", &full]),
                &PatternSet::new().must_find(format!("Bucket '{full}/' created")),
            )?;
        } else if refresh {
            ctx.check(
                None,
                &ctx.s3(["del", "--recursive", "--force", &full]),
                &PatternSet::new(),
            )?;
        }
        self.exists(ctx)
    }

    /// Remove the bucket and everything in it
    pub fn remove(&self, ctx: &HarnessContext) -> HarnessResult<()> {
        ctx.check(
            None,
            &ctx.s3(["rb", "--recursive", "--force", &self.full_name()]),
            &PatternSet::new(),
        )?;
        Ok(())
    }

    /// Upload a local file as `key` (or its own file name)
    ///
    /// Files above the multipart threshold are sent in chunks.
    pub fn put(
        &self,
        ctx: &HarnessContext,
        local: &Path,
        key: Option<&str>,
    ) -> HarnessResult<ObjectRef> {
        let size = std::fs::metadata(local)?.len();
        let key = match key {
            Some(key) => key.to_string(),
            None => local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let object = ObjectRef::new(key)
            .in_bucket(self.clone())
            .with_local(local, size);

        let mut args = vec!["put".to_string()];
        if object.needs_multipart() {
            args.push(format!("--multipart-chunk-size-mb={MULTIPART_CHUNK_MB}"));
        }
        args.push(local.display().to_string());
        args.push(object.full_name());

        ctx.check(
            None,
            &ctx.s3(args),
            &PatternSet::new().must_find(format!("-> '{}'", object.full_name())),
        )?;
        Ok(object)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{S3_SCHEME}{}", self.name)
    }
}

/// An object: key, optional bucket, optional local source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    name: String,
    bucket: Option<Bucket>,
    local_path: Option<PathBuf>,
    size: Option<u64>,
}

impl ObjectRef {
    /// Object with a key only
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket: None,
            local_path: None,
            size: None,
        }
    }

    /// Place the object in a bucket
    pub fn in_bucket(mut self, bucket: Bucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Attach the local file it was uploaded from
    pub fn with_local(mut self, path: impl Into<PathBuf>, size: u64) -> Self {
        self.local_path = Some(path.into());
        self.size = Some(size);
        self
    }

    /// Object key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning bucket, if known
    pub fn bucket(&self) -> Option<&Bucket> {
        self.bucket.as_ref()
    }

    /// Local source file, if known
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// `s3://bucket/key`, or the bare key without a bucket
    pub fn full_name(&self) -> String {
        match &self.bucket {
            Some(bucket) => bucket.object_url(&self.name),
            None => self.name.clone(),
        }
    }

    /// Whether the local source is large enough for a multipart upload
    pub fn needs_multipart(&self) -> bool {
        self.size.is_some_and(|size| size > MULTIPART_THRESHOLD)
    }
}

/// Remove every bucket whose name starts with the context's prefix
///
/// Returns the number of buckets removed.
pub fn remove_all_test_buckets(ctx: &HarnessContext) -> HarnessResult<usize> {
    let buckets = test_buckets(ctx)?;
    for bucket in &buckets {
        bucket.remove(ctx)?;
    }
    if !buckets.is_empty() {
        tracing::info!(count = buckets.len(), "Removed test buckets");
    }
    Ok(buckets.len())
}

/// Delete every object in every test bucket, keeping the buckets
pub fn clear_all_test_buckets(ctx: &HarnessContext) -> HarnessResult<usize> {
    let buckets = test_buckets(ctx)?;
    for bucket in &buckets {
        ctx.check(
            None,
            &ctx.s3(["rm", "--recursive", "--force", &bucket.full_name()]),
            &PatternSet::new(),
        )?;
    }
    Ok(buckets.len())
}

/// Buckets in the listing that carry the test prefix
pub fn test_buckets(ctx: &HarnessContext) -> HarnessResult<Vec<Bucket>> {
    let result = ctx.execute(&ctx.s3(["ls"]))?;
    if result.exit_code() != EX_OK {
        return Ok(Vec::new());
    }
    let prefix = format!("{S3_SCHEME}{}", ctx.bucket_prefix());
    Ok(listed_urls(result.output())
        .filter(|url| url.starts_with(&prefix))
        .map(Bucket::from_full_name)
        .collect())
}

/// The `s3://` URL at the end of each listing line
fn listed_urls(output: &str) -> impl Iterator<Item = &str> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .filter(|token| token.starts_with(S3_SCHEME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EX_NOTFOUND;
    use crate::process::ExecutionResult;
    use crate::testing::{test_context, MockRunner};
    use std::io::Write as _;

    const LISTING: &str = "2024-01-01 00:00  s3://test-1\n\
                           2024-01-01 00:00  s3://test-10\n\
                           2024-01-01 00:00  s3://other-2\n";

    fn command(args: &[String]) -> Vec<&str> {
        // drop the CLI path
        args[1..].iter().map(String::as_str).collect()
    }

    #[test]
    fn test_names() {
        let bucket = Bucket::from_suffix("test-", "1");
        assert_eq!(bucket.name(), "test-1");
        assert_eq!(bucket.full_name(), "s3://test-1");
        assert_eq!(bucket.to_string(), "s3://test-1");
        assert_eq!(Bucket::from_full_name("s3://test-1/"), bucket);

        let object = ObjectRef::new("obj-0").in_bucket(bucket);
        assert_eq!(object.full_name(), "s3://test-1/obj-0");
        assert_eq!(ObjectRef::new("loose").full_name(), "loose");
    }

    #[test]
    fn test_needs_multipart() {
        let small = ObjectRef::new("a").with_local("a", MULTIPART_THRESHOLD);
        let large = ObjectRef::new("b").with_local("b", MULTIPART_THRESHOLD + 1);
        assert!(!small.needs_multipart());
        assert!(large.needs_multipart());
        assert!(!ObjectRef::new("c").needs_multipart());
    }

    #[test]
    fn test_exists_matches_whole_name() {
        let (ctx, _) = test_context(MockRunner::replying(EX_OK, LISTING));
        assert!(ctx.bucket("1").exists(&ctx).unwrap());
        assert!(!ctx.bucket("100").exists(&ctx).unwrap());
    }

    #[test]
    fn test_list_and_contains() {
        let listing = "2024-01-01 00:00  1024  s3://test-1/obj-0\n\
                       2024-01-01 00:00  1024  s3://test-1/dir/obj-1\n";
        let (ctx, _) = test_context(MockRunner::replying(EX_OK, listing));
        let bucket = ctx.bucket("1");

        assert_eq!(bucket.list(&ctx).unwrap(), ["obj-0", "dir/obj-1"]);
        assert!(bucket.contains(&ctx, "dir/obj-1").unwrap());
        assert!(!bucket.contains(&ctx, "obj-1").unwrap());
        assert!(!bucket.is_empty(&ctx).unwrap());
    }

    #[test]
    fn test_list_of_missing_bucket_is_empty() {
        let (ctx, _) = test_context(MockRunner::replying(EX_NOTFOUND, "ERROR: not found"));
        assert!(ctx.bucket("1").is_empty(&ctx).unwrap());
    }

    #[test]
    fn test_create_missing_bucket() {
        let (ctx, runner) = test_context(MockRunner::from_fn(|inv| {
            Ok(match inv.args()[1].as_str() {
                "mb" => ExecutionResult::new(EX_OK, "Bucket 's3://test-new/' created"),
                _ => ExecutionResult::new(EX_OK, ""),
            })
        }));

        // the mock listing never shows the bucket, so create reports false
        assert!(!ctx.bucket("new").create(&ctx, false).unwrap());
        let commands = runner.seen();
        assert_eq!(command(&commands[0]), ["ls"]);
        assert_eq!(command(&commands[1]), ["mb", "s3://test-new"]);
    }

    #[test]
    fn test_create_existing_bucket_with_refresh() {
        let (ctx, runner) = test_context(MockRunner::replying(EX_OK, LISTING));
        assert!(ctx.bucket("1").create(&ctx, true).unwrap());

        let commands = runner.seen();
        assert_eq!(
            command(&commands[1]),
            ["del", "--recursive", "--force", "s3://test-1"]
        );
    }

    #[test]
    fn test_create_existing_bucket_without_refresh() {
        let (ctx, runner) = test_context(MockRunner::replying(EX_OK, LISTING));
        assert!(ctx.bucket("1").create(&ctx, false).unwrap());
        // two listings, no mutation
        assert_eq!(runner.calls(), 2);
    }

    #[test]
    fn test_put_small_and_large() {
        let mut small = tempfile::NamedTempFile::new().unwrap();
        small.write_all(&[0u8; 16]).unwrap();
        let large = tempfile::NamedTempFile::new().unwrap();
        large.as_file().set_len(MULTIPART_THRESHOLD + 1).unwrap();

        let (ctx, runner) = test_context(MockRunner::from_fn(|inv| {
            let dest = inv.args().last().cloned().unwrap_or_default();
            Ok(ExecutionResult::new(EX_OK, format!("upload: 'x' -> '{dest}'")))
        }));
        let bucket = ctx.bucket("1");

        let object = bucket.put(&ctx, small.path(), Some("obj-0")).unwrap();
        assert_eq!(object.full_name(), "s3://test-1/obj-0");
        bucket.put(&ctx, large.path(), Some("obj-1")).unwrap();

        let commands = runner.seen();
        assert_eq!(commands[0].len(), 4);
        assert_eq!(commands[1][2], "--multipart-chunk-size-mb=5");
    }

    #[test]
    fn test_remove_all_test_buckets() {
        let (ctx, runner) = test_context(MockRunner::replying(EX_OK, LISTING));
        assert_eq!(remove_all_test_buckets(&ctx).unwrap(), 2);

        let removed: Vec<String> = runner
            .seen()
            .iter()
            .filter(|args| args[1] == "rb")
            .map(|args| args.last().cloned().unwrap_or_default())
            .collect();
        assert_eq!(removed, ["s3://test-1", "s3://test-10"]);
    }

    #[test]
    fn test_clear_all_test_buckets() {
        let (ctx, runner) = test_context(MockRunner::replying(EX_OK, LISTING));
        assert_eq!(clear_all_test_buckets(&ctx).unwrap(), 2);
        assert!(runner
            .seen()
            .iter()
            .skip(1)
            .all(|args| command(args)[..3] == ["rm", "--recursive", "--force"]));
    }
}

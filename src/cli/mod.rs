//! CLI argument parsing and suite dispatch

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use s3harness_core::{HarnessConfig, HarnessContext};

use crate::suites::{self, BucketSuite, LoadSuite, ObjectSuite, Suite};

/// s3harness - Regression and load tests for an s3cmd-style storage CLI
#[derive(Parser, Debug)]
#[command(name = "s3harness")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Harness configuration file (TOML)
    #[arg(long, env = "S3HARNESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the storage CLI under test
    #[arg(long, env = "S3HARNESS_CLI")]
    pub cli_path: Option<String>,

    /// Interpreter to launch the CLI with (e.g. python3)
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Configuration file handed to the CLI as `-c <file>`
    #[arg(short = 'c', long = "s3cmd-config", env = "S3CMD_CONFIG")]
    pub s3cmd_config: Option<PathBuf>,

    /// Prefix of every test bucket
    #[arg(long)]
    pub bucket_prefix: Option<String>,

    /// Suites to run
    #[arg(short, long = "test", value_enum, default_values_t = [SuiteName::All])]
    pub tests: Vec<SuiteName>,

    /// Load workers per operation kind
    #[arg(long)]
    pub threads: Option<usize>,

    /// Operations per load worker (-1 runs until the first failure)
    #[arg(long, allow_negative_numbers = true)]
    pub ops: Option<i64>,

    /// Objects pre-populated for the DELETE load run (default: threads * ops)
    #[arg(long)]
    pub objects: Option<usize>,

    /// Largest fixture file to generate, in bytes
    #[arg(long)]
    pub max_fixture_bytes: Option<u64>,

    /// Write load statistics as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Hide the load progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Dump command output on pass and log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Selectable suites
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuiteName {
    /// Bucket create/list/remove
    Bucket,
    /// Object put/get/list/delete
    Object,
    /// Concurrent PUT/GET/DELETE workers
    Load,
    /// Every suite, in the order above
    All,
}

impl Cli {
    /// Merge the configuration file with the command-line overrides
    pub fn harness_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("Failed to load config from: {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(path) = &self.cli_path {
            config = config.with_cli_path(path);
        }
        if let Some(interpreter) = &self.interpreter {
            config = config.with_interpreter(interpreter);
        }
        if let Some(path) = &self.s3cmd_config {
            config = config.with_cli_config_file(path);
        }
        if let Some(prefix) = &self.bucket_prefix {
            config = config.with_bucket_prefix(prefix);
        }
        if let Some(max) = self.max_fixture_bytes {
            config = config.with_fixture_max_bytes(max);
        }
        let threads = self.threads.unwrap_or(config.load.threads);
        let ops = self.ops.unwrap_or(config.load.ops_per_thread);
        let objects = self.objects.unwrap_or(config.load.objects);
        config = config.with_load(threads, ops, objects);
        if self.verbose {
            config = config.with_verbose(true);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Suites to run, in order, without repeats
    pub fn selected_suites(&self) -> Vec<SuiteName> {
        let mut selected = Vec::new();
        for name in &self.tests {
            let expanded: &[SuiteName] = match name {
                SuiteName::All => &[SuiteName::Bucket, SuiteName::Object, SuiteName::Load],
                other => std::slice::from_ref(other),
            };
            for name in expanded {
                if !selected.contains(name) {
                    selected.push(*name);
                }
            }
        }
        selected
    }

    /// Run the selected suites
    pub fn run(&self) -> Result<()> {
        let config = self.harness_config()?;
        tracing::info!(cli = %config.cli.path, prefix = %config.bucket_prefix, "Starting s3harness");

        print_header(&config);

        let ctx = Arc::new(HarnessContext::new(&config));
        let result = self.run_suites(&ctx, &config);
        ctx.reporter().summary();
        result
    }

    fn run_suites(&self, ctx: &Arc<HarnessContext>, config: &HarnessConfig) -> Result<()> {
        for name in self.selected_suites() {
            let suite: Box<dyn Suite> = match name {
                SuiteName::Bucket => Box::new(BucketSuite),
                SuiteName::Object => Box::new(ObjectSuite),
                SuiteName::Load => Box::new(
                    LoadSuite::new(config.load.clone())
                        .with_json(self.json.clone())
                        .with_progress(!self.no_progress),
                ),
                SuiteName::All => continue,
            };
            suites::run(suite.as_ref(), ctx)?;
        }
        Ok(())
    }
}

fn print_header(config: &HarnessConfig) {
    let command = match &config.cli.interpreter {
        Some(interpreter) => format!("{interpreter} {}", config.cli.path),
        None => config.cli.path.clone(),
    };

    println!("\n{}", "=".repeat(70));
    println!("   {}", style("s3harness - storage CLI regression and load tests").bold());
    println!("{}", "=".repeat(70));
    println!();
    println!("Configuration:");
    println!("  CLI:           {command}");
    if let Some(file) = &config.cli.config_file {
        println!("  CLI config:    {}", file.display());
    }
    println!("  Bucket prefix: {}", config.bucket_prefix);
    println!("  Fixtures:      {}", config.fixture_dir.display());
    println!(
        "  Load:          {} threads x {} ops",
        config.load.threads, config.load.ops_per_thread
    );
    println!("{}", "=".repeat(70));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("s3harness").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.tests, [SuiteName::All]);
        assert_eq!(
            cli.selected_suites(),
            [SuiteName::Bucket, SuiteName::Object, SuiteName::Load]
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn test_suite_selection_keeps_order_without_repeats() {
        let cli = parse(&["--test", "load", "-t", "bucket", "--test", "all"]);
        assert_eq!(
            cli.selected_suites(),
            [SuiteName::Load, SuiteName::Bucket, SuiteName::Object]
        );
    }

    #[test]
    fn test_overrides_reach_the_config() {
        let cli = parse(&[
            "--cli-path",
            "/opt/s3cmd/s3cmd",
            "--interpreter",
            "python3",
            "-c",
            "/etc/s3cfg",
            "--bucket-prefix",
            "ci-",
            "--threads",
            "4",
            "--ops",
            "-1",
            "--objects",
            "500",
            "-v",
        ]);
        let config = cli.harness_config().unwrap();

        assert_eq!(config.cli.path, "/opt/s3cmd/s3cmd");
        assert_eq!(config.cli.interpreter.as_deref(), Some("python3"));
        assert_eq!(config.cli.config_file, Some(PathBuf::from("/etc/s3cfg")));
        assert_eq!(config.bucket_prefix, "ci-");
        assert_eq!(config.load.threads, 4);
        assert_eq!(config.load.ops_per_thread, -1);
        assert_eq!(config.load.objects, 500);
        assert!(config.verbose);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3harness.toml");
        std::fs::write(
            &path,
            "bucket_prefix = \"file-\"\n[load]\nthreads = 3\nops_per_thread = 7\n",
        )
        .unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "--ops", "9"]);
        let config = cli.harness_config().unwrap();
        assert_eq!(config.bucket_prefix, "file-");
        assert_eq!(config.load.threads, 3);
        assert_eq!(config.load.ops_per_thread, 9);
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let cli = parse(&["--threads", "0"]);
        assert!(cli.harness_config().is_err());

        let cli = parse(&["--bucket-prefix", "Not_Valid"]);
        assert!(cli.harness_config().is_err());
    }

    #[test]
    fn test_unknown_suite_is_a_parse_error() {
        assert!(Cli::try_parse_from(["s3harness", "--test", "sync"]).is_err());
    }
}

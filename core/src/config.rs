//! Harness configuration types

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessResult;

/// How the storage CLI under test is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Interpreter placed before the CLI path (e.g. `python`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Path or name of the CLI executable or script
    pub path: String,

    /// CLI configuration file, passed as `-c <file>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,

    /// Extra environment for every invocation
    pub env: BTreeMap<String, String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            interpreter: None,
            path: "s3cmd".to_string(),
            config_file: None,
            env: BTreeMap::new(),
        }
    }
}

/// Load-test sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Worker threads per operation kind
    pub threads: usize,

    /// Operations per worker; `-1` runs until stopped
    pub ops_per_thread: i64,

    /// Objects pre-populated for GET/DELETE runs; `0` derives it from the budget
    pub objects: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            ops_per_thread: 20,
            objects: 0,
        }
    }
}

/// Harness configuration
///
/// Read from a TOML file and then overridden from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// CLI launch settings
    pub cli: CliConfig,

    /// Prefix of every bucket the harness creates and cleans up
    pub bucket_prefix: String,

    /// Directory holding the generated fixture files
    pub fixture_dir: PathBuf,

    /// Directory downloads are written to
    pub download_dir: PathBuf,

    /// Scratch directory for suite output
    pub out_dir: PathBuf,

    /// Largest fixture size class to generate and use, in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture_max_bytes: Option<u64>,

    /// Dump command output on pass too
    pub verbose: bool,

    /// Load-test sizing
    pub load: LoadConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cli: CliConfig::default(),
            bucket_prefix: default_bucket_prefix(),
            fixture_dir: PathBuf::from("test-data"),
            download_dir: PathBuf::from("test-download"),
            out_dir: PathBuf::from("testsuite-out"),
            fixture_max_bytes: None,
            verbose: false,
            load: LoadConfig::default(),
        }
    }
}

fn default_bucket_prefix() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "harness".to_string());
    // bucket names only allow lowercase letters, digits, '-' and '.'
    let user: String = user
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{user}-s3harness-")
}

impl HarnessConfig {
    /// Parse a TOML configuration file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse TOML text
    pub fn from_toml(text: &str) -> HarnessResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the CLI path
    pub fn with_cli_path(mut self, path: impl Into<String>) -> Self {
        self.cli.path = path.into();
        self
    }

    /// Set the interpreter placed before the CLI path
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.cli.interpreter = Some(interpreter.into());
        self
    }

    /// Set the CLI configuration file
    pub fn with_cli_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli.config_file = Some(path.into());
        self
    }

    /// Add an environment variable for every invocation
    pub fn with_cli_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cli.env.insert(key.into(), value.into());
        self
    }

    /// Set the bucket prefix
    pub fn with_bucket_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bucket_prefix = prefix.into();
        self
    }

    /// Set the fixture directory
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = dir.into();
        self
    }

    /// Set the download directory
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set the output directory
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Restrict fixtures to size classes of at most `bytes`
    pub fn with_fixture_max_bytes(mut self, bytes: u64) -> Self {
        self.fixture_max_bytes = Some(bytes);
        self
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the load-test sizing
    pub fn with_load(mut self, threads: usize, ops_per_thread: i64, objects: usize) -> Self {
        self.load = LoadConfig {
            threads,
            ops_per_thread,
            objects,
        };
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cli.path.trim().is_empty() {
            return Err(ConfigError::InvalidCliPath(
                "CLI path must not be empty".into(),
            ));
        }

        if self.bucket_prefix.is_empty() {
            return Err(ConfigError::InvalidBucketPrefix(
                "bucket prefix must not be empty".into(),
            ));
        }

        if !self
            .bucket_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            return Err(ConfigError::InvalidBucketPrefix(format!(
                "`{}` may only contain lowercase letters, digits, '-' and '.'",
                self.bucket_prefix
            )));
        }

        if self.load.threads == 0 {
            return Err(ConfigError::InvalidLoad(
                "threads must be at least 1".into(),
            ));
        }

        if self.load.ops_per_thread < -1 || self.load.ops_per_thread == 0 {
            return Err(ConfigError::InvalidLoad(
                "ops_per_thread must be positive or -1".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unusable CLI path
    #[error("Invalid CLI path: {0}")]
    InvalidCliPath(String),

    /// Unusable bucket prefix
    #[error("Invalid bucket prefix: {0}")]
    InvalidBucketPrefix(String),

    /// Invalid load-test sizing
    #[error("Invalid load settings: {0}")]
    InvalidLoad(String),
}

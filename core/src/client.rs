//! Invocation builder for the storage CLI under test

use std::path::PathBuf;

use crate::config::CliConfig;
use crate::process::Invocation;

/// Prefixes CLI arguments with the launch command
///
/// Produces `[interpreter?, path, (-c config)?, args...]` with the configured
/// environment attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliInvoker {
    interpreter: Option<String>,
    path: String,
    config_file: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CliInvoker {
    /// Invoker for a bare executable
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            interpreter: None,
            path: path.into(),
            config_file: None,
            env: Vec::new(),
        }
    }

    /// Invoker from configuration
    pub fn from_config(config: &CliConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            path: config.path.clone(),
            config_file: config.config_file.clone(),
            env: config
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Build an invocation of the CLI with `args`
    pub fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv: Vec<String> = Vec::new();
        argv.extend(self.interpreter.iter().cloned());
        argv.push(self.path.clone());
        if let Some(config_file) = &self.config_file {
            argv.push("-c".to_string());
            argv.push(config_file.display().to_string());
        }
        argv.extend(args.into_iter().map(Into::into));

        self.env
            .iter()
            .fold(Invocation::new(argv), |inv, (k, v)| inv.with_env(k, v))
    }
}

//! Subprocess invocation with merged output capture
//!
//! An [`Invocation`] is one call to an external program: its argument vector,
//! an optional stdin source, extra environment and the exit codes the caller
//! is willing to accept. A [`CommandRunner`] turns it into an
//! [`ExecutionResult`] holding the exit code and the interleaved
//! stdout+stderr text.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{HarnessError, HarnessResult};
use crate::exit_codes::EX_OK;

/// Where a subprocess reads its standard input from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinSource {
    /// Bytes held in memory, written through a pipe
    Bytes(Vec<u8>),
    /// A local file opened read-only and handed to the child
    File(PathBuf),
}

/// One call to an external command
///
/// Built with the `with_*` / `accept*` methods and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<String>,
    stdin: Option<StdinSource>,
    env: Vec<(String, String)>,
    accepted: Vec<i32>,
}

impl Invocation {
    /// Create an invocation from a full argument vector (program first)
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            env: Vec::new(),
            accepted: vec![EX_OK],
        }
    }

    /// An invocation with no arguments; verifying it is a skip
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Feed the given bytes on stdin
    pub fn with_stdin_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(StdinSource::Bytes(bytes.into()));
        self
    }

    /// Feed the content of a local file on stdin
    pub fn with_stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(StdinSource::File(path.into()));
        self
    }

    /// Set an environment variable for the child
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Accept exactly one exit code
    pub fn accept(mut self, code: i32) -> Self {
        self.accepted = vec![code];
        self
    }

    /// Accept any of the given exit codes
    pub fn accept_any(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.accepted = codes.into_iter().collect();
        self
    }

    /// Full argument vector, program first
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Stdin source, if any
    pub fn stdin(&self) -> Option<&StdinSource> {
        self.stdin.as_ref()
    }

    /// Extra environment for the child
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Exit codes that count as success for this call
    pub fn accepted_codes(&self) -> &[i32] {
        &self.accepted
    }

    /// Whether `code` is in the accepted set
    pub fn accepts(&self, code: i32) -> bool {
        self.accepted.contains(&code)
    }

    /// Whether there is nothing to run
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Printable command line; arguments containing spaces are single-quoted
    pub fn command_line(&self) -> String {
        self.args
            .iter()
            .map(|arg| {
                if arg.contains(' ') {
                    format!("'{arg}'")
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit code and captured output of one finished invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    exit_code: i32,
    output: String,
}

impl ExecutionResult {
    /// Create a result (used by runners and test doubles)
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    /// Terminal status code; `-1` when the child was killed by a signal
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Merged stdout+stderr, undecodable bytes replaced
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Whether the exit code is `EX_OK`
    pub fn success(&self) -> bool {
        self.exit_code == EX_OK
    }
}

/// Executes invocations
///
/// The production implementation spawns a real process; tests substitute a
/// scripted runner.
pub trait CommandRunner: Send + Sync {
    /// Run to completion, blocking the calling thread
    fn run(&self, invocation: &Invocation) -> HarnessResult<ExecutionResult>;
}

/// Runs invocations as child processes of the harness
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    /// Create a subprocess runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SubprocessRunner {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ExecutionResult> {
        let spawn_error = |source: io::Error| HarnessError::Spawn {
            command: invocation.command_line(),
            source,
        };

        let (program, rest) = invocation.args().split_first().ok_or_else(|| {
            spawn_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty argument list",
            ))
        })?;

        // stdout and stderr share one pipe so the transcript keeps its order
        let (mut reader, writer) = io::pipe()?;
        let mut command = Command::new(program);
        command
            .args(rest)
            .envs(invocation.env().iter().map(|(k, v)| (k, v)))
            .stdout(writer.try_clone()?)
            .stderr(writer);

        match invocation.stdin() {
            None => command.stdin(Stdio::null()),
            Some(StdinSource::File(path)) => command.stdin(File::open(path)?),
            Some(StdinSource::Bytes(_)) => command.stdin(Stdio::piped()),
        };

        let mut child = command.spawn().map_err(spawn_error)?;
        // The command still owns write ends of the pipe; reading would never see EOF
        drop(command);

        let child_stdin = child.stdin.take();
        let mut raw = Vec::new();
        std::thread::scope(|scope| -> io::Result<()> {
            if let (Some(mut pipe), Some(StdinSource::Bytes(bytes))) =
                (child_stdin, invocation.stdin())
            {
                scope.spawn(move || {
                    // The child may exit without draining stdin
                    let _ = pipe.write_all(bytes);
                });
            }
            reader.read_to_end(&mut raw)?;
            Ok(())
        })?;

        let status = child.wait()?;
        Ok(ExecutionResult {
            exit_code: status.code().unwrap_or(-1),
            output: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

//! Execute-and-assert engine
//!
//! [`VerificationEngine::run_and_verify`] runs one [`Invocation`], checks the
//! exit code against its accepted set and then the [`PatternSet`], stopping at
//! the first failed check. Failures are reported (status line plus a dump of
//! the command and its output) before being handed back to the caller.

use std::fmt;
use std::sync::Arc;

use crate::error::HarnessResult;
use crate::exit_codes;
use crate::pattern::{find_first_missing, find_first_present, PatternSet};
use crate::process::{CommandRunner, ExecutionResult, Invocation};
use crate::reporter::TestReporter;

/// Why a verification failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Exit code not in the accepted set
    ExitCode {
        /// Code the command returned
        actual: i32,
        /// Codes that would have passed
        accepted: Vec<i32>,
    },
    /// A must-find pattern did not occur
    PatternMissing {
        /// Pattern as declared
        pattern: String,
    },
    /// A must-not-find pattern occurred
    PatternPresent {
        /// Pattern as declared
        pattern: String,
        /// Text it matched
        matched: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode { actual, accepted } => {
                write!(f, "retcode: {actual}")?;
                if let Some(name) = exit_codes::name(*actual) {
                    write!(f, " ({name})")?;
                }
                let accepted: Vec<String> = accepted
                    .iter()
                    .map(|&code| {
                        exit_codes::name(code).map_or_else(|| code.to_string(), str::to_string)
                    })
                    .collect();
                write!(f, ", expected one of: [{}]", accepted.join(", "))
            }
            Self::PatternMissing { pattern } => write!(f, "pattern not found: {pattern}"),
            Self::PatternPresent { pattern, matched } => {
                write!(f, "pattern found: {pattern} (match: {matched})")
            }
        }
    }
}

/// A failed verification with everything needed to diagnose it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{reason}", label_prefix(.label))]
pub struct VerificationFailure {
    /// Test-case label, when the call was a counted case
    pub label: Option<String>,
    /// Printable command line
    pub command_line: String,
    /// Captured output
    pub output: String,
    /// Failed check
    pub reason: FailureReason,
}

/// Result of one verified invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Every check passed
    Pass(ExecutionResult),
    /// Nothing was run
    Skip(String),
    /// A check failed
    Fail(VerificationFailure),
}

impl VerificationOutcome {
    /// Whether the outcome is a pass
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }

    /// Whether the outcome is a skip
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    /// The failure, if any
    pub fn failure(&self) -> Option<&VerificationFailure> {
        match self {
            Self::Fail(failure) => Some(failure),
            _ => None,
        }
    }

    /// Turn a failure into an error, keeping pass and skip
    pub fn into_result(self) -> HarnessResult<Self> {
        match self {
            Self::Fail(failure) => Err(failure.into()),
            other => Ok(other),
        }
    }
}

/// Runs invocations and asserts on their exit code and output
#[derive(Clone)]
pub struct VerificationEngine {
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<TestReporter>,
}

impl VerificationEngine {
    /// Create an engine over a runner and a shared reporter
    pub fn new(runner: Arc<dyn CommandRunner>, reporter: Arc<TestReporter>) -> Self {
        Self { runner, reporter }
    }

    /// The shared reporter
    pub fn reporter(&self) -> &Arc<TestReporter> {
        &self.reporter
    }

    /// Run an invocation without any assertion
    pub fn execute(&self, invocation: &Invocation) -> HarnessResult<ExecutionResult> {
        self.runner.run(invocation)
    }

    /// Run and verify, returning the outcome
    ///
    /// With a `label` the case is numbered on the console and a pass is
    /// counted; without one the call is setup or teardown and only a failure
    /// is reported. An empty invocation is a skip. `Err` is reserved for
    /// plumbing problems: an invalid pattern or a command that cannot start.
    pub fn run_and_verify(
        &self,
        label: Option<&str>,
        invocation: &Invocation,
        patterns: &PatternSet,
    ) -> HarnessResult<VerificationOutcome> {
        let compiled = patterns.compile()?;
        if let Some(label) = label {
            self.reporter.begin(label);
        }

        if invocation.is_empty() {
            let reason = label.unwrap_or("empty invocation").to_string();
            self.reporter.skip(label);
            return Ok(VerificationOutcome::Skip(reason));
        }

        let result = self.runner.run(invocation)?;
        let output = result.output();

        let reason = if !invocation.accepts(result.exit_code()) {
            Some(FailureReason::ExitCode {
                actual: result.exit_code(),
                accepted: invocation.accepted_codes().to_vec(),
            })
        } else if let Some(missing) = find_first_missing(output, &compiled.required) {
            Some(FailureReason::PatternMissing {
                pattern: missing.source().to_string(),
            })
        } else {
            find_first_present(output, &compiled.forbidden).map(|(pattern, matched)| {
                FailureReason::PatternPresent {
                    pattern: pattern.source().to_string(),
                    matched: matched.to_string(),
                }
            })
        };

        let command_line = invocation.command_line();
        match reason {
            Some(reason) => {
                tracing::debug!(
                    command = %command_line,
                    exit_code = result.exit_code(),
                    reason = %reason,
                    "Verification failed"
                );
                self.reporter
                    .fail(&reason.to_string(), &command_line, output);
                Ok(VerificationOutcome::Fail(VerificationFailure {
                    label: label.map(str::to_string),
                    command_line,
                    output: output.to_string(),
                    reason,
                }))
            }
            None => {
                if label.is_some() {
                    self.reporter.pass(None);
                }
                if self.reporter.is_verbose() {
                    self.reporter.dump(&command_line, output);
                }
                Ok(VerificationOutcome::Pass(result))
            }
        }
    }

    /// Run and verify, turning a failed check into `Err`
    ///
    /// This is the fail-fast form: a caller using `?` never continues past
    /// a failed step.
    pub fn check(
        &self,
        label: Option<&str>,
        invocation: &Invocation,
        patterns: &PatternSet,
    ) -> HarnessResult<VerificationOutcome> {
        self.run_and_verify(label, invocation, patterns)?
            .into_result()
    }
}

impl fmt::Debug for VerificationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationEngine")
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

fn label_prefix(label: &Option<String>) -> String {
    label
        .as_deref()
        .map(|label| format!("{label}: "))
        .unwrap_or_default()
}

//! Console reporting of test-case status
//!
//! One [`TestReporter`] is shared by every caller of the verification engine.
//! Counters are atomics; printing goes through a lock so the FAIL line and its
//! diagnostic dump from one thread are never interleaved with another's.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use console::style;
use serde::Serialize;

const LABEL_WIDTH: usize = 30;
const BANNER_WIDTH: usize = 40;

/// Snapshot of the pass/fail/skip counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    /// Counted passing cases
    pub passed: usize,
    /// Failed cases
    pub failed: usize,
    /// Skipped cases
    pub skipped: usize,
}

/// Pass/fail/skip counters plus colour-coded status printing
#[derive(Debug, Default)]
pub struct TestReporter {
    passed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    label_open: AtomicBool,
    verbose: bool,
    print_lock: Mutex<()>,
}

impl TestReporter {
    /// Create a reporter; `verbose` dumps command output on pass too
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    /// Whether passing commands are dumped
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether a label was printed and no status has followed it yet
    pub fn has_open_label(&self) -> bool {
        self.label_open.load(Ordering::Relaxed)
    }

    /// Number of decided cases so far
    pub fn num_tests(&self) -> usize {
        self.passed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    /// Current counter values
    pub fn counts(&self) -> ReportCounts {
        ReportCounts {
            passed: self.passed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters (between suites)
    pub fn reset(&self) {
        self.passed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }

    /// Print the numbered, dot-padded label of the next case
    pub fn begin(&self, label: &str) {
        let head = format!("{:3}  {} ", self.num_tests() + 1, label);
        self.print_inline(&head);
    }

    /// Print an unnumbered, dot-padded step label (setup steps)
    pub fn begin_step(&self, label: &str) {
        self.print_inline(&format!("{label} "));
    }

    /// Record a counted pass and print OK
    pub fn pass(&self, message: Option<&str>) {
        self.passed.fetch_add(1, Ordering::Relaxed);
        self.ok(message);
    }

    /// Print OK without counting
    pub fn ok(&self, message: Option<&str>) {
        let _guard = self.lock();
        self.label_open.store(false, Ordering::Relaxed);
        println!(
            "{}{}",
            style("OK").green().bright(),
            style(format_message(message)).green().bright()
        );
    }

    /// Record a failure and print FAIL followed by the command dump
    pub fn fail(&self, message: &str, command_line: &str, output: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let _guard = self.lock();
        self.label_open.store(false, Ordering::Relaxed);
        println!(
            "{}{}",
            style("FAIL").red().bright(),
            style(format_message(Some(message))).red().bright()
        );
        print_dump(command_line, output);
    }

    /// Record a skip and print SKIP
    pub fn skip(&self, message: Option<&str>) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        let _guard = self.lock();
        self.label_open.store(false, Ordering::Relaxed);
        println!(
            "{}{}",
            style("SKIP").yellow().bright(),
            style(format_message(message)).yellow().bright()
        );
    }

    /// Dump a command and its output (verbose mode)
    pub fn dump(&self, command_line: &str, output: &str) {
        let _guard = self.lock();
        print_dump(command_line, output);
    }

    /// Suite start banner
    pub fn banner(&self, name: &str) {
        let label = format!("{name} Test");
        let _guard = self.lock();
        println!("\n{}", framed(&label));
    }

    /// Suite end banner
    pub fn end_banner(&self, name: &str) {
        let label = format!("End of {name} test");
        let _guard = self.lock();
        println!("{}", framed(&label));
    }

    /// Final counter line
    ///
    /// A label left open by a step that errored out is closed with ERROR.
    pub fn summary(&self) {
        let counts = self.counts();
        let _guard = self.lock();
        if self.label_open.swap(false, Ordering::Relaxed) {
            println!("{}", style("ERROR").red().bright());
        }
        println!(
            "\n{} passed, {} failed, {} skipped",
            style(counts.passed).green(),
            style(counts.failed).red(),
            style(counts.skipped).yellow()
        );
    }

    fn print_inline(&self, head: &str) {
        let _guard = self.lock();
        self.label_open.store(true, Ordering::Relaxed);
        print!("{} ", pad_label(head));
        let _ = std::io::stdout().flush();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // Printing only; a poisoned lock still serialises output
        self.print_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn format_message(message: Option<&str>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!("  ({m})"),
        _ => String::new(),
    }
}

fn print_dump(command_line: &str, output: &str) {
    println!("----");
    println!("{command_line}");
    println!("----");
    println!("{output}");
    println!("----");
}

fn pad_label(head: &str) -> String {
    let len = head.chars().count();
    if len >= LABEL_WIDTH {
        head.to_string()
    } else {
        format!("{head}{}", ".".repeat(LABEL_WIDTH - len))
    }
}

fn framed(label: &str) -> String {
    let side = BANNER_WIDTH.saturating_sub(label.chars().count() + 2) / 2;
    let fill = "=".repeat(side);
    format!("{fill} {label} {fill}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_label() {
        assert_eq!(pad_label("  1  Make bucket "), "  1  Make bucket .............");
        assert_eq!(pad_label("  1  Make bucket ").len(), LABEL_WIDTH);

        let long = "  1  A label that is already longer than thirty ";
        assert_eq!(pad_label(long), long);
    }

    #[test]
    fn test_framed_banner() {
        assert_eq!(framed("Bucket Test"), "============= Bucket Test =============");
    }

    #[test]
    fn test_format_message() {
        assert_eq!(format_message(None), "");
        assert_eq!(format_message(Some("")), "");
        assert_eq!(format_message(Some("why")), "  (why)");
    }

    #[test]
    fn test_counters() {
        let reporter = TestReporter::new(false);
        reporter.pass(None);
        reporter.pass(Some("fine"));
        reporter.fail("pattern not found: x", "s3cmd ls", "");
        reporter.skip(None);
        reporter.ok(None);

        assert_eq!(
            reporter.counts(),
            ReportCounts {
                passed: 2,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(reporter.num_tests(), 3);

        reporter.reset();
        assert_eq!(reporter.counts(), ReportCounts::default());
    }

    #[test]
    fn test_label_stays_open_until_a_status() {
        let reporter = TestReporter::new(false);
        assert!(!reporter.has_open_label());

        reporter.begin("Make bucket");
        assert!(reporter.has_open_label());
        reporter.pass(None);
        assert!(!reporter.has_open_label());

        reporter.begin_step("Populate");
        reporter.summary();
        assert!(!reporter.has_open_label());
    }

    #[test]
    fn test_counts_serialize() {
        let counts = ReportCounts {
            passed: 3,
            failed: 0,
            skipped: 1,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"passed":3,"failed":0,"skipped":1}"#);
    }
}

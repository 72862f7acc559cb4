//! Result reporting.
//!
//! The runner reports through the [`TestReporter`] trait so output formats stay separate from
//! execution. [`ConsoleReporter`] prints the classic harness lines (`<name> pass`, the failure block)
//! followed by a colored summary.

use std::io::{self, Write};
use std::time::Duration;

use super::{FailureDetail, ScenarioResult};

/// Receives run events in order.
pub trait TestReporter {
    /// Called once the scenario list is known (after filtering).
    fn on_collection_complete(&mut self, scenario_count: usize);

    /// Called before a scenario is dispatched.
    fn on_scenario_start(&mut self, _name: &str) {}

    fn on_scenario_complete(&mut self, name: &str, result: &ScenarioResult);

    fn on_run_complete(&mut self, summary: &TestSummary);
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn record(&mut self, result: &ScenarioResult) {
        self.total += 1;
        match result {
            ScenarioResult::Passed(_) => self.passed += 1,
            ScenarioResult::Failed(..) => self.failed += 1,
            ScenarioResult::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Plain-text reporter.
pub struct ConsoleReporter {
    verbose: bool,
    color: bool,
    out: Box<dyn Write>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConsoleReporter {
    /// Reporter writing to stdout with ANSI colors.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            color: true,
            out: Box::new(io::stdout()),
        }
    }

    /// Reporter writing uncolored text to `out`.
    pub fn with_writer(verbose: bool, out: Box<dyn Write>) -> Self {
        Self {
            verbose,
            color: false,
            out,
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    // Reporting never fails a run; write errors (closed pipe) are dropped.
    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl TestReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, scenario_count: usize) {
        if scenario_count == 0 {
            self.emit("No scenarios collected\n");
        } else if self.verbose {
            self.emit(&format!("collected {} scenario(s)\n\n", scenario_count));
        }
    }

    fn on_scenario_start(&mut self, name: &str) {
        if self.verbose {
            self.emit(&format!("{} ...\n", name));
        }
    }

    fn on_scenario_complete(&mut self, name: &str, result: &ScenarioResult) {
        let line = match result {
            ScenarioResult::Passed(d) => {
                let mut line = format!("{} {}", name, self.paint("32", "pass"));
                if self.verbose {
                    line.push_str(&format!(" ({}ms)", d.as_millis()));
                }
                line.push('\n');
                line
            }
            ScenarioResult::Failed(_, FailureDetail::Streams(failure)) => {
                let report = failure.report(name);
                match report.split_once(" fail:") {
                    Some((head, tail)) => format!("{} {}:{}", head, self.paint("31", "fail"), tail),
                    None => report,
                }
            }
            ScenarioResult::Failed(_, FailureDetail::Message(message)) => {
                format!("{} {}:\n\t{}\n", name, self.paint("31", "fail"), message)
            }
            ScenarioResult::Skipped(reason) => {
                format!("{} {} ({})\n", name, self.paint("33", "skipped"), reason)
            }
        };
        self.emit(&line);
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        if summary.total == 0 {
            return;
        }

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(self.paint("32", &format!("{} passed", summary.passed)));
        }
        if summary.failed > 0 {
            parts.push(self.paint("31", &format!("{} failed", summary.failed)));
        }
        if summary.skipped > 0 {
            parts.push(self.paint("33", &format!("{} skipped", summary.skipped)));
        }

        let line = format!(
            "\n====== {} in {:.2}s ======\n",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
        self.emit(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::TestFailure;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_console_lines() {
        let buf = SharedBuf::default();
        let mut reporter = ConsoleReporter::with_writer(false, Box::new(buf.clone()));

        reporter.on_scenario_complete("A/ok", &ScenarioResult::Passed(Duration::from_millis(5)));
        reporter.on_scenario_complete(
            "A/bad",
            &ScenarioResult::Failed(Duration::ZERO, FailureDetail::Streams(TestFailure::new("o", "e"))),
        );
        reporter.on_scenario_complete("A/skip", &ScenarioResult::Skipped("no domain".to_string()));

        let mut summary = TestSummary::default();
        summary.record(&ScenarioResult::Passed(Duration::ZERO));
        summary.record(&ScenarioResult::Skipped(String::new()));
        reporter.on_run_complete(&summary);

        assert_eq!(
            buf.text(),
            "A/ok pass\n\
             A/bad fail:\n\tstdout: o\n\tstderr: e\n\
             A/skip skipped (no domain)\n\
             \n====== 1 passed, 1 skipped in 0.00s ======\n"
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = TestSummary::default();
        summary.record(&ScenarioResult::Failed(Duration::ZERO, FailureDetail::Message("x".into())));
        summary.record(&ScenarioResult::Passed(Duration::ZERO));
        assert_eq!(summary.total, 2);
        assert!(!summary.all_passed());
    }
}

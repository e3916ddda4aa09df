//! Report Rendering
//!
//! Renders a finished batch as plain text. Rendering is pure; callers decide
//! where the text goes.

use std::time::Duration;

use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};

use crate::execution::{State, UnitResult};

use super::summary::BatchSummary;

/// Presentation settings for one report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// How many of the slowest passing units to list
    pub top: usize,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
    /// When the run started
    pub started: DateTime<Local>,
}

/// Colours a state label for the terminal.
pub fn state_label(state: State) -> ColoredString {
    let label = format!("{:<10}", state.label());
    match state {
        State::Pass => label.green().bold(),
        State::Fail => label.red().bold(),
        State::ExecError => label.magenta().bold(),
        State::UserError => label.yellow().bold(),
    }
}

/// Renders the full report for `results`.
///
/// Sections, in order: header, every result, the slowest passes, every
/// failure, and the summary line.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chrono::Local;
/// use smokerunner::execution::{State, UnitResult};
/// use smokerunner::report::{render_report, ReportOptions};
///
/// let results = vec![UnitResult::new("1", State::Pass, Duration::from_millis(4), "PASS: id [1]")];
/// let options = ReportOptions { top: 5, elapsed: Duration::from_millis(9), started: Local::now() };
///
/// let text = render_report(&results, &options);
/// assert!(text.contains("1 pass(es) - 0 failure(s) - elapsed 9 ms"));
/// ```
pub fn render_report(results: &[UnitResult], options: &ReportOptions) -> String {
    let summary = BatchSummary::from_results(results, options.top);
    let mut output = String::new();

    output.push_str(&format!(
        "{} v{} - run started {}\n",
        crate::APP_NAME.bold(),
        crate::VERSION,
        options.started.format("%Y-%m-%d %H:%M:%S")
    ));

    output.push_str(&format!("\n{}\n", "Results:".bold()));
    for result in summary.results() {
        output.push_str(&format!("{} {}\n", state_label(result.state()), result.message()));
    }

    if !summary.slowest().is_empty() {
        let heading = format!("Slowest {} pass(es):", summary.slowest().len());
        output.push_str(&format!("\n{}\n", heading.bold()));
        for result in summary.slowest() {
            output.push_str(&format!(
                "  {:>8} ms  [{}]\n",
                result.elapsed().as_millis(),
                result.id()
            ));
        }
    }

    if summary.failed_count() > 0 {
        output.push_str(&format!("\n{}\n", "Failures:".bold()));
        for result in summary.failures() {
            output.push_str(&format!("{} {}\n", state_label(result.state()), result.message()));
        }
    }

    output.push_str(&format!("\n{}\n", summary_line(&summary, options.elapsed)));
    output
}

/// The closing `SUMM:` line.
pub fn summary_line(summary: &BatchSummary<'_>, elapsed: Duration) -> String {
    let line = format!(
        "SUMM: {} pass(es) - {} failure(s) - elapsed {} ms",
        summary.passed_count(),
        summary.failed_count(),
        elapsed.as_millis()
    );

    if summary.failed_count() > 0 {
        line.red().bold().to_string()
    } else {
        line.green().bold().to_string()
    }
}

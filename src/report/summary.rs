//! Batch Summary
//!
//! Counts and rankings over a finished batch. Anything that is not
//! [`State::Pass`] counts as a failure.
//!
//! [`State::Pass`]: crate::execution::State::Pass

use std::cmp::Reverse;

use crate::config::exit_code;
use crate::execution::UnitResult;

/// Number of results that did not pass.
pub fn failed_count(results: &[UnitResult]) -> usize {
    results.iter().filter(|r| !r.is_pass()).count()
}

/// Number of results that passed.
pub fn passed_count(results: &[UnitResult]) -> usize {
    results.len() - failed_count(results)
}

/// The `k` slowest passing results, slowest first.
///
/// Ties keep their batch order.
pub fn slowest(results: &[UnitResult], k: usize) -> Vec<&UnitResult> {
    let mut passes: Vec<&UnitResult> = results.iter().filter(|r| r.is_pass()).collect();
    passes.sort_by_key(|r| Reverse(r.elapsed()));
    passes.truncate(k);
    passes
}

/// Process exit code for a batch: non-zero iff anything failed.
pub fn exit_status(results: &[UnitResult]) -> u8 {
    if failed_count(results) > 0 {
        exit_code::FAILURES
    } else {
        exit_code::SUCCESS
    }
}

/// A borrowed view over a batch's results with the derived figures.
#[derive(Debug, Clone)]
pub struct BatchSummary<'a> {
    results: &'a [UnitResult],
    slowest: Vec<&'a UnitResult>,
    failed: usize,
}

impl<'a> BatchSummary<'a> {
    /// Summarizes `results`, keeping the `top` slowest passes.
    pub fn from_results(results: &'a [UnitResult], top: usize) -> Self {
        Self {
            results,
            slowest: slowest(results, top),
            failed: failed_count(results),
        }
    }

    pub fn results(&self) -> &'a [UnitResult] {
        self.results
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn passed_count(&self) -> usize {
        self.total() - self.failed
    }

    pub fn slowest(&self) -> &[&'a UnitResult] {
        &self.slowest
    }

    /// Every non-passing result, in batch order.
    pub fn failures(&self) -> impl Iterator<Item = &'a UnitResult> {
        self.results.iter().filter(|r| !r.is_pass())
    }

    pub fn exit_status(&self) -> u8 {
        if self.failed > 0 {
            exit_code::FAILURES
        } else {
            exit_code::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::State;
    use std::time::Duration;

    fn result(id: &str, state: State, ms: u64) -> UnitResult {
        UnitResult::new(id, state, Duration::from_millis(ms), format!("{} {}", state, id))
    }

    #[test]
    fn test_counts_and_exit_status() {
        let results = vec![
            result("1", State::Pass, 10),
            result("2", State::Fail, 20),
            result("3", State::Pass, 30),
        ];

        assert_eq!(failed_count(&results), 1);
        assert_eq!(passed_count(&results), 2);
        assert_ne!(exit_status(&results), 0);

        let summary = BatchSummary::from_results(&results, 5);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.passed_count(), 2);
        assert_eq!(summary.exit_status(), exit_code::FAILURES);
    }

    #[test]
    fn test_every_non_pass_state_fails() {
        let results = vec![
            result("1", State::ExecError, 1),
            result("2", State::UserError, 1),
            result("3", State::Fail, 1),
        ];
        assert_eq!(failed_count(&results), 3);
        assert_eq!(passed_count(&results), 0);
    }

    #[test]
    fn test_all_pass_exits_zero() {
        let results = vec![result("1", State::Pass, 1)];
        assert_eq!(exit_status(&results), 0);
        assert_eq!(exit_status(&[]), 0);
    }

    #[test]
    fn test_slowest_only_passes_descending() {
        let results = vec![
            result("a", State::Pass, 10),
            result("b", State::Fail, 999),
            result("c", State::Pass, 50),
            result("d", State::Pass, 30),
        ];

        let ids: Vec<&str> = slowest(&results, 2).iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["c", "d"]);
    }

    #[test]
    fn test_slowest_is_stable_on_ties() {
        let results = vec![
            result("a", State::Pass, 5),
            result("b", State::Pass, 5),
            result("c", State::Pass, 5),
        ];

        let ids: Vec<&str> = slowest(&results, 5).iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_failures_keep_batch_order() {
        let results = vec![
            result("1", State::Fail, 1),
            result("2", State::Pass, 1),
            result("3", State::ExecError, 1),
        ];
        let summary = BatchSummary::from_results(&results, 0);

        let ids: Vec<&str> = summary.failures().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(summary.slowest().is_empty());
    }
}

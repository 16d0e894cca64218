//! Salad (lettuce) step summary: `3 steps (1 failed, 2 passed)`.
//! Anything that did not pass, skipped steps included, counts as failed.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{group_count, last_captures, CountError, ResultParser, TestCounter};
use crate::core::models::RunResult;

static STEPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) steps? \(([^)]*)\)").expect("valid salad steps pattern"));

static PASSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) passed").expect("valid salad passed pattern"));

#[derive(Debug, Default, Clone, Copy)]
pub struct SaladParser;

impl SaladParser {
    /// `(total, passed)` from the final step summary.
    fn steps(result: &RunResult) -> Result<(usize, usize), CountError> {
        let caps = last_captures(&STEPS, result.cleaned_output()).ok_or_else(|| {
            CountError::NoMatch {
                pattern: STEPS.as_str().to_string(),
            }
        })?;
        let total = group_count(&caps, 1)?;
        let details = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let passed = match PASSED.captures(details) {
            Some(passed) => group_count(&passed, 1)?,
            None => 0,
        };
        Ok((total, passed.min(total)))
    }
}

impl ResultParser for SaladParser {
    fn name(&self) -> &str {
        "salad"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("salad")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(self)
    }
}

impl TestCounter for SaladParser {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        Self::steps(result).map(|(_, passed)| passed)
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        let (total, passed) = Self::steps(result)?;
        Ok(total - passed)
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        Self::steps(result).map(|(total, _)| total)
    }
}

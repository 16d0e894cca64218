//! Karma redraws one progress line in place while it runs:
//!
//! ```text
//! Executed 1 of 2 SUCCESS (0 secs / 0.001 secs)
//! Executed 2 of 2 (1 FAILED) (0.005 secs / 0.003 secs)
//! ```
//!
//! Every redraw stays in the captured output, so only the last one counts.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{group_count, last_captures, CountError, ResultParser, TestCounter};
use crate::core::models::RunResult;

static EXECUTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Executed (\d+) of (\d+)(?: \((\d+) FAILED\))?")
        .expect("valid karma progress pattern")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct KarmaParser;

impl KarmaParser {
    /// `(total, failed)` from the final progress line.
    fn progress(result: &RunResult) -> Result<(usize, usize), CountError> {
        let caps = last_captures(&EXECUTED, result.cleaned_output()).ok_or_else(|| {
            CountError::NoMatch {
                pattern: EXECUTED.as_str().to_string(),
            }
        })?;
        let total = group_count(&caps, 2)?;
        let failed = match caps.get(3) {
            Some(_) => group_count(&caps, 3)?,
            None => 0,
        };
        Ok((total, failed))
    }
}

impl ResultParser for KarmaParser {
    fn name(&self) -> &str {
        "karma"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("karma")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(self)
    }
}

impl TestCounter for KarmaParser {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        let (total, failed) = Self::progress(result)?;
        Ok(total.saturating_sub(failed))
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        Self::progress(result).map(|(_, failed)| failed)
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        Self::progress(result).map(|(total, _)| total)
    }
}

//! py.test prints one summary line whose tokens come and go independently:
//!
//! ```text
//! ==== 2 failed, 10 passed, 1 error in 1.00 seconds ====
//! ```
//!
//! Absent tokens mean zero. Errors are folded into the failure count.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{last_count_or_zero, CountError, ResultParser, TestCounter};
use crate::core::models::RunResult;

static PASSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) passed").expect("valid py.test passed pattern"));

static FAILED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) failed").expect("valid py.test failed pattern"));

static ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) error").expect("valid py.test error pattern"));

#[derive(Debug, Default, Clone, Copy)]
pub struct PyTestParser;

impl ResultParser for PyTestParser {
    fn name(&self) -> &str {
        "py.test"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("py.test") || command.contains("pytest")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(self)
    }
}

impl TestCounter for PyTestParser {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        last_count_or_zero(&PASSED, result.cleaned_output(), 1)
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        let failed = last_count_or_zero(&FAILED, result.cleaned_output(), 1)?;
        Ok(failed + self.num_error(result)?)
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        Ok(self.num_passed(result)? + self.num_failed(result)?)
    }

    fn num_error(&self, result: &RunResult) -> Result<usize, CountError> {
        last_count_or_zero(&ERROR, result.cleaned_output(), 1)
    }
}

//! Protractor (jasmine reporter) summary: `2 tests, 3 assertions, 1 failure`.
//! Failures are counted per assertion, so the total is the assertion count.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{last_count, CountError, ResultParser, TestCounter};
use crate::core::models::RunResult;

static SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+) tests?, (\d+) assertions?, (\d+) failures?")
        .expect("valid protractor summary pattern")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct ProtractorParser;

impl ResultParser for ProtractorParser {
    fn name(&self) -> &str {
        "protractor"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("protractor")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(self)
    }
}

impl TestCounter for ProtractorParser {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        Ok(self.num_total(result)?.saturating_sub(self.num_failed(result)?))
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        last_count(&SUMMARY, result.cleaned_output(), 3)
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        last_count(&SUMMARY, result.cleaned_output(), 2)
    }
}

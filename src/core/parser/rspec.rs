//! RSpec closes every run with `<N> examples, <F> failures`. RSpec makes no
//! distinction between failures and errors, so both counts are the same.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{last_count, CountError, ResultParser, TestCounter};
use crate::core::models::RunResult;

static EXAMPLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) examples?").expect("valid rspec examples pattern"));

static FAILURES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) failures?").expect("valid rspec failures pattern"));

#[derive(Debug, Default, Clone, Copy)]
pub struct RspecParser;

impl ResultParser for RspecParser {
    fn name(&self) -> &str {
        "rspec"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("rspec")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(self)
    }
}

impl TestCounter for RspecParser {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        Ok(self.num_total(result)?.saturating_sub(self.num_failed(result)?))
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        last_count(&FAILURES, result.cleaned_output(), 1)
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        last_count(&EXAMPLES, result.cleaned_output(), 1)
    }

    fn num_error(&self, result: &RunResult) -> Result<usize, CountError> {
        self.num_failed(result)
    }
}

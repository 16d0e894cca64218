//! Parsers for the Python `unittest` output family (unittest, nose, Django).
//!
//! ```text
//! Ran 12 tests in 0.031s
//!
//! FAILED (errors=1, failures=2)
//! ```
//!
//! A passing run ends with `OK` (optionally `OK (skipped=N)`) instead of the
//! `FAILED` line. Django keeps errors out of the failure count; nose and
//! unittest fold them in.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{group_count, last_captures, last_count, CountError, ResultParser, TestCounter};
use crate::core::models::RunResult;

static RAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Ran (\d+) tests?").expect("valid unittest total pattern"));

static STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:OK|FAILED)(?: \(([^)]*)\))?[ \t]*\r?$")
        .expect("valid unittest status pattern")
});

static FAILURES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"failures=(\d+)").expect("valid unittest failures pattern"));

static ERRORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"errors=(\d+)").expect("valid unittest errors pattern"));

static NOSE_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnosetests\b|-m\s+nose\b").expect("valid nose command pattern")
});

/// Failures and errors from the last status line; both zero when the run
/// printed `OK` or no status line at all.
fn status_counts(result: &RunResult) -> Result<(usize, usize), CountError> {
    let Some(status) = last_captures(&STATUS, result.cleaned_output()) else {
        return Ok((0, 0));
    };
    let details = status.get(1).map(|m| m.as_str()).unwrap_or_default();
    let failures = match FAILURES.captures(details) {
        Some(caps) => group_count(&caps, 1)?,
        None => 0,
    };
    let errors = match ERRORS.captures(details) {
        Some(caps) => group_count(&caps, 1)?,
        None => 0,
    };
    Ok((failures, errors))
}

fn ran_total(result: &RunResult) -> Result<usize, CountError> {
    last_count(&RAN, result.cleaned_output(), 1)
}

/// Counting shared by the family; `fold_errors` decides whether errors are
/// reported as failures.
#[derive(Debug, Clone, Copy)]
struct UnittestCounter {
    fold_errors: bool,
}

impl TestCounter for UnittestCounter {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        Ok(self.num_total(result)?.saturating_sub(self.num_failed(result)?))
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        let (failures, errors) = status_counts(result)?;
        Ok(if self.fold_errors {
            failures + errors
        } else {
            failures
        })
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        ran_total(result)
    }

    fn num_error(&self, result: &RunResult) -> Result<usize, CountError> {
        status_counts(result).map(|(_, errors)| errors)
    }
}

static FOLDING: UnittestCounter = UnittestCounter { fold_errors: true };
static NOT_FOLDING: UnittestCounter = UnittestCounter { fold_errors: false };

/// `python manage.py test`. Errors are not counted as failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct DjangoParser;

impl ResultParser for DjangoParser {
    fn name(&self) -> &str {
        "django"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("manage.py test")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(&NOT_FOLDING)
    }
}

/// `nosetests` / `python -m nose`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoseParser;

impl ResultParser for NoseParser {
    fn name(&self) -> &str {
        "nose"
    }

    fn command_matches(&self, command: &str) -> bool {
        NOSE_COMMAND.is_match(command)
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(&FOLDING)
    }
}

/// `python -m unittest`, whose output is the same as nose's.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnittestParser;

impl ResultParser for UnittestParser {
    fn name(&self) -> &str {
        "unittest"
    }

    fn command_matches(&self, command: &str) -> bool {
        command.contains("unittest")
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        Some(&FOLDING)
    }
}

//! Parsers declared in the configuration file.
//!
//! Each count is a regular expression whose first capture group holds the
//! number; as with the bundled parsers, the last match wins.
//!
//! ```toml
//! [parsers."acme.CargoParser"]
//! command_matches = "cargo test"
//! passed = '(\d+) passed;'
//! failed = '(\d+) failed;'
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{last_count, last_count_or_zero, CountError, ResultParser, TestCounter};
use crate::core::config::ConfigError;
use crate::core::models::RunResult;

/// The `[parsers."<module.Name>"]` table of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatternParserConfig {
    /// Display name; defaults to the type part of the reference.
    #[serde(default)]
    pub name: Option<String>,
    /// Substring that makes auto-detection pick this parser.
    #[serde(default, alias = "commandMatches")]
    pub command_matches: Option<String>,
    #[serde(default)]
    pub passed: Option<String>,
    #[serde(default)]
    pub failed: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
    /// Report errors as failures too.
    #[serde(default, alias = "foldErrors")]
    pub fold_errors: bool,
}

#[derive(Debug)]
pub struct PatternParser {
    name: String,
    command_matches: Option<String>,
    passed: Option<Regex>,
    failed: Option<Regex>,
    error: Option<Regex>,
    total: Option<Regex>,
    fold_errors: bool,
}

impl PatternParser {
    /// Compiles the patterns of `config`, registered as `reference`.
    pub fn from_config(reference: &str, config: &PatternParserConfig) -> Result<Self, ConfigError> {
        let compile = |pattern: &Option<String>| -> Result<Option<Regex>, ConfigError> {
            pattern
                .as_deref()
                .map(|p| {
                    Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                        parser: reference.to_string(),
                        pattern: p.to_string(),
                        source,
                    })
                })
                .transpose()
        };

        let name = config.name.clone().unwrap_or_else(|| {
            reference
                .rsplit('.')
                .next()
                .unwrap_or(reference)
                .to_string()
        });

        Ok(Self {
            name,
            command_matches: config.command_matches.clone().filter(|s| !s.is_empty()),
            passed: compile(&config.passed)?,
            failed: compile(&config.failed)?,
            error: compile(&config.error)?,
            total: compile(&config.total)?,
            fold_errors: config.fold_errors,
        })
    }

    fn count_or_zero(pattern: &Option<Regex>, result: &RunResult) -> Result<usize, CountError> {
        match pattern {
            Some(re) => last_count_or_zero(re, result.cleaned_output(), 1),
            None => Ok(0),
        }
    }
}

impl ResultParser for PatternParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn command_matches(&self, command: &str) -> bool {
        self.command_matches
            .as_deref()
            .is_some_and(|needle| command.contains(needle))
    }

    fn counter(&self) -> Option<&dyn TestCounter> {
        let counts_anything =
            self.passed.is_some() || self.failed.is_some() || self.total.is_some();
        counts_anything.then_some(self as &dyn TestCounter)
    }
}

impl TestCounter for PatternParser {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError> {
        match (&self.passed, &self.total) {
            (Some(passed), _) => last_count_or_zero(passed, result.cleaned_output(), 1),
            (None, Some(_)) => Ok(self.num_total(result)?.saturating_sub(self.num_failed(result)?)),
            (None, None) => Err(CountError::Unsupported { what: "passed" }),
        }
    }

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError> {
        let failed = Self::count_or_zero(&self.failed, result)?;
        if self.fold_errors {
            Ok(failed + Self::count_or_zero(&self.error, result)?)
        } else {
            Ok(failed)
        }
    }

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError> {
        match &self.total {
            Some(total) => last_count(total, result.cleaned_output(), 1),
            None if self.passed.is_some() => {
                Ok(self.num_passed(result)? + self.num_failed(result)?)
            }
            None => Err(CountError::Unsupported { what: "total" }),
        }
    }

    fn num_error(&self, result: &RunResult) -> Result<usize, CountError> {
        match &self.error {
            Some(error) => last_count_or_zero(error, result.cleaned_output(), 1),
            None => Err(CountError::Unsupported { what: "error" }),
        }
    }
}

//! # Result Parser Module / 结果解析器模块
//!
//! A parser turns a suite's [`RunResult`] into a verdict and, when the
//! framework prints a recognizable status line, into test counts.
//!
//! Counting is an explicit capability: a parser that can count returns a
//! [`TestCounter`] from [`ResultParser::counter`]. Every count is taken from
//! the **last** matching status line, because several frameworks redraw
//! their progress line in place and only the final one is meaningful.
//!
//! 解析器将套件的运行结果转换为判定，并在框架输出可识别的
//! 状态行时提取测试计数。所有计数都取最后一个匹配的状态行。

use regex::{Captures, Regex};
use std::sync::Arc;
use thiserror::Error;

use crate::core::models::RunResult;

pub mod karma;
pub mod pattern;
pub mod protractor;
pub mod pytest;
pub mod rspec;
pub mod salad;
pub mod standard;
pub mod unittest;

pub use karma::KarmaParser;
pub use pattern::{PatternParser, PatternParserConfig};
pub use protractor::ProtractorParser;
pub use pytest::PyTestParser;
pub use rspec::RspecParser;
pub use salad::SaladParser;
pub use standard::StandardParser;
pub use unittest::{DjangoParser, NoseParser, UnittestParser};

/// Module path under which the bundled parsers are registered.
pub const BUNDLED_MODULE: &str = "poly_runner.parsers";

/// Errors raised while extracting a count from captured output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CountError {
    #[error("no status line matching `{pattern}` in the output")]
    NoMatch { pattern: String },

    #[error("`{value}` is not a valid test count")]
    InvalidNumber { value: String },

    #[error("this parser does not report {what} counts")]
    Unsupported { what: &'static str },
}

/// Interprets the captured output of a suite.
pub trait ResultParser: Send + Sync {
    /// Human readable framework name, used in detection lines.
    fn name(&self) -> &str;

    /// Whether this parser recognizes `command` as its framework.
    ///
    /// Only consulted while auto-detecting parsers, never at run time.
    fn command_matches(&self, _command: &str) -> bool {
        false
    }

    /// The verdict for a finished run. Must not panic on odd output and
    /// should lean towards "failed" when the output is ambiguous.
    fn tests_passed(&self, result: &RunResult) -> bool {
        result.exit_code() == Some(0)
    }

    /// The counting capability, for frameworks with a status line.
    fn counter(&self) -> Option<&dyn TestCounter> {
        None
    }
}

/// Extracts test counts from a framework's status lines.
pub trait TestCounter: Send + Sync {
    fn num_passed(&self, result: &RunResult) -> Result<usize, CountError>;

    fn num_failed(&self, result: &RunResult) -> Result<usize, CountError>;

    fn num_total(&self, result: &RunResult) -> Result<usize, CountError>;

    /// Unexpected errors, for frameworks that tell them apart from
    /// assertion failures.
    fn num_error(&self, _result: &RunResult) -> Result<usize, CountError> {
        Err(CountError::Unsupported { what: "error" })
    }
}

/// An ordered set of parsers addressable by dotted reference.
///
/// Registration order is the auto-detection order.
#[derive(Clone)]
pub struct ParserRegistry {
    entries: Vec<(String, Arc<dyn ResultParser>)>,
    fallback: Arc<dyn ResultParser>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// An empty registry whose only parser is the exit-code fallback.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: Arc::new(StandardParser),
        }
    }

    /// The registry with every bundled framework parser, in detection order.
    pub fn bundled() -> Self {
        let mut registry = Self::new();
        registry.register_bundled("DjangoParser", DjangoParser);
        registry.register_bundled("NoseParser", NoseParser);
        registry.register_bundled("UnittestParser", UnittestParser);
        registry.register_bundled("PyTestParser", PyTestParser);
        registry.register_bundled("RspecParser", RspecParser);
        registry.register_bundled("KarmaParser", KarmaParser);
        registry.register_bundled("ProtractorParser", ProtractorParser);
        registry.register_bundled("SaladParser", SaladParser);
        registry.register_bundled("StandardParser", StandardParser);
        registry
    }

    fn register_bundled(&mut self, type_name: &str, parser: impl ResultParser + 'static) {
        self.register(format!("{BUNDLED_MODULE}.{type_name}"), Arc::new(parser));
    }

    /// Registers `parser` under `reference`, replacing an earlier entry with
    /// the same reference in place.
    pub fn register(&mut self, reference: impl Into<String>, parser: Arc<dyn ResultParser>) {
        let reference = reference.into();
        match self.entries.iter_mut().find(|(name, _)| *name == reference) {
            Some(entry) => entry.1 = parser,
            None => self.entries.push((reference, parser)),
        }
    }

    /// Registers `parser` ahead of every existing entry, so auto-detection
    /// consults it first.
    pub fn register_front(&mut self, reference: impl Into<String>, parser: Arc<dyn ResultParser>) {
        let reference = reference.into();
        self.entries.retain(|(name, _)| *name != reference);
        self.entries.insert(0, (reference, parser));
    }

    /// Looks up a parser by its full dotted reference.
    pub fn get(&self, reference: &str) -> Option<Arc<dyn ResultParser>> {
        self.entries
            .iter()
            .find(|(name, _)| name == reference)
            .map(|(_, parser)| Arc::clone(parser))
    }

    /// The first registered parser that recognizes `command`.
    pub fn detect(&self, command: &str) -> Option<Arc<dyn ResultParser>> {
        self.entries
            .iter()
            .find(|(_, parser)| parser.command_matches(command))
            .map(|(_, parser)| Arc::clone(parser))
    }

    /// The parser used when nothing else applies.
    pub fn fallback(&self) -> Arc<dyn ResultParser> {
        Arc::clone(&self.fallback)
    }

    /// Registered references, in detection order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// Splits a parser reference into module path and type name.
///
/// Returns `None` unless the reference has at least two non-empty dotted
/// components.
pub fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let (module, type_name) = reference.rsplit_once('.')?;
    if module.is_empty() || type_name.is_empty() || module.split('.').any(str::is_empty) {
        return None;
    }
    Some((module, type_name))
}

/// The last match of `pattern` in `text`.
pub(crate) fn last_captures<'t>(pattern: &Regex, text: &'t str) -> Option<Captures<'t>> {
    pattern.captures_iter(text).last()
}

/// Parses capture group `group` of `caps` as a count.
pub(crate) fn group_count(caps: &Captures<'_>, group: usize) -> Result<usize, CountError> {
    let value = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
    value.parse().map_err(|_| CountError::InvalidNumber {
        value: value.to_string(),
    })
}

/// The count in group `group` of the last match, or an error naming the
/// pattern when it never matched.
pub(crate) fn last_count(
    pattern: &Regex,
    text: &str,
    group: usize,
) -> Result<usize, CountError> {
    match last_captures(pattern, text) {
        Some(caps) => group_count(&caps, group),
        None => Err(CountError::NoMatch {
            pattern: pattern.as_str().to_string(),
        }),
    }
}

/// Like [`last_count`], but a missing status line counts as zero.
pub(crate) fn last_count_or_zero(
    pattern: &Regex,
    text: &str,
    group: usize,
) -> Result<usize, CountError> {
    match last_captures(pattern, text) {
        Some(caps) => group_count(&caps, group),
        None => Ok(0),
    }
}

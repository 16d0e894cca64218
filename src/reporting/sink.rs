//! # Report Sink Module / 报告接收器模块
//!
//! Everything the runner tells its user is a [`ReportLine`] handed to a
//! [`ReportSink`]. The engine never prints directly, which lets the console
//! sink own coloring and lets tests and embedders capture the lines.
//!
//! 运行器输出的所有内容都是交给报告接收器的报告行，引擎从不直接打印。

use std::sync::Mutex;

/// How a line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Success,
    Failure,
    Warning,
    Muted,
    /// Captured suite output, passed through verbatim.
    Output,
}

/// One human readable report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub tone: Tone,
    /// Nesting depth; the console indents two spaces per level.
    pub indent: usize,
    pub text: String,
}

impl ReportLine {
    pub fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            indent: 0,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(Tone::Plain, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Tone::Success, text)
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self::new(Tone::Failure, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Tone::Warning, text)
    }

    pub fn muted(text: impl Into<String>) -> Self {
        Self::new(Tone::Muted, text)
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self::new(Tone::Output, text)
    }

    pub fn indented(mut self, levels: usize) -> Self {
        self.indent += levels;
        self
    }
}

/// Receives report lines. Shared between the foreground loop and run
/// cycles, so implementations must be thread safe.
pub trait ReportSink: Send + Sync {
    fn emit(&self, line: ReportLine);
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<ReportLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the lines emitted so far.
    pub fn lines(&self) -> Vec<ReportLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The text of every line emitted so far.
    pub fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|line| line.text).collect()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.text.contains(needle))
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, line: ReportLine) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}

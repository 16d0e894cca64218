//! # Data Models Module / 数据模型模块
//!
//! This module defines the per-run data captured for a suite: the raw
//! output, the ANSI-stripped view parsers match against, the exit code and
//! the verdict the reporter settles on.
//!
//! 此模块定义一次套件运行所捕获的数据：原始输出、
//! 供解析器匹配的去除 ANSI 的文本、退出码以及最终判定。

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::borrow::Cow;
use std::fmt;

/// CSI sequences (colors, cursor movement), OSC sequences (titles, links)
/// and the remaining two-byte escapes.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\-_])")
        .expect("ANSI escape pattern is valid")
});

/// Removes every ANSI escape sequence from `text`.
///
/// Borrows the input unchanged when it contains no escapes.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

/// The captured state of one suite for one run attempt.
///
/// Output is append-only and kept in arrival order, stdout and stderr
/// interleaved. The cleaned view is computed on first use and invalidated
/// by every append.
#[derive(Default)]
pub struct RunResult {
    raw: Vec<u8>,
    cleaned: OnceCell<String>,
    exit_code: Option<i32>,
    passed: Option<bool>,
    timed_out: bool,
    spawn_error: Option<String>,
}

impl RunResult {
    /// Creates an empty result for a freshly spawned suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a finished result from known output and exit code.
    pub fn finished(output: impl AsRef<[u8]>, exit_code: Option<i32>) -> Self {
        let mut result = Self::new();
        result.append(output.as_ref());
        result.exit_code = exit_code;
        result
    }

    /// Appends a chunk of captured output.
    pub fn append(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.raw.extend_from_slice(chunk);
        self.cleaned.take();
    }

    /// Appends a line written by the runner itself (not by the child).
    pub fn append_note(&mut self, note: &str) {
        if !self.raw.is_empty() && !self.raw.ends_with(b"\n") {
            self.append(b"\n");
        }
        self.append(note.as_bytes());
        self.append(b"\n");
    }

    /// The raw captured output, decoded lossily as UTF-8.
    pub fn output(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// The captured output with ANSI escape sequences removed.
    pub fn cleaned_output(&self) -> &str {
        self.cleaned
            .get_or_init(|| strip_ansi(&self.output()).into_owned())
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The exit code as returned by the process.
    ///
    /// `None` until the child terminates, and also when it was killed by a
    /// signal, timed out or never started.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, code: Option<i32>) {
        self.exit_code = code;
    }

    /// The verdict, once the reporter has evaluated it.
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    pub fn set_passed(&mut self, passed: bool) {
        self.passed = Some(passed);
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    /// The reason the child could not be started, if it could not.
    pub fn spawn_error(&self) -> Option<&str> {
        self.spawn_error.as_deref()
    }

    pub fn set_spawn_error(&mut self, error: impl Into<String>) {
        self.spawn_error = Some(error.into());
    }
}

impl fmt::Debug for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunResult")
            .field("output_bytes", &self.raw.len())
            .field("exit_code", &self.exit_code)
            .field("passed", &self.passed)
            .field("timed_out", &self.timed_out)
            .field("spawn_error", &self.spawn_error)
            .finish()
    }
}

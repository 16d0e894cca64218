//! # Console Reporting Module / 控制台报告模块
//!
//! Prints report lines to the terminal, colored by tone.
//!
//! 按语气为报告行着色并打印到终端。

use colored::*;
use std::io::{self, Write};

use super::sink::{ReportLine, ReportSink, Tone};

/// Writes report lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

/// Renders `line` the way the console shows it.
///
/// Multi-line text is indented line by line so captured output stays
/// aligned under its suite.
pub fn render_line(line: &ReportLine) -> String {
    let pad = "  ".repeat(line.indent);
    line.text
        .lines()
        .map(|text| {
            let styled = match line.tone {
                Tone::Plain | Tone::Output => text.normal(),
                Tone::Success => text.green(),
                Tone::Failure => text.red(),
                Tone::Warning => text.yellow(),
                Tone::Muted => text.dimmed(),
            };
            format!("{pad}{styled}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl ReportSink for ConsoleSink {
    fn emit(&self, line: ReportLine) {
        let rendered = render_line(&line);
        let mut stdout = io::stdout().lock();
        // A closed stdout is not worth aborting a test run for.
        let _ = writeln!(stdout, "{rendered}");
        let _ = stdout.flush();
    }
}

//! # Run Summary Module / 运行汇总模块
//!
//! Settles each executed suite's verdict and reports it: one line per
//! suite, the captured output under every failure, then the overall line.
//!
//! 确定每个已执行套件的判定并输出报告：每个套件一行，
//! 失败套件附带其捕获的输出，最后输出总体结果。

use crate::core::execution::SuiteRun;
use crate::core::models::RunResult;
use crate::core::parser::{CountError, ResultParser, TestCounter};
use crate::infra::t;

use super::sink::{ReportLine, ReportSink};

/// The reported outcome of one suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub name: String,
    pub short_name: String,
    pub passed: bool,
    /// Counts the parser could extract; `None` where it could not.
    pub num_passed: Option<usize>,
    pub num_failed: Option<usize>,
    pub num_total: Option<usize>,
}

/// The reported outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<SuiteReport>,
}

impl RunSummary {
    /// `true` when every executed suite passed. Vacuously true for no suites.
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(|report| report.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SuiteReport> {
        self.reports.iter().filter(|report| !report.passed)
    }
}

/// Evaluates and reports every run, in the order given.
///
/// Sets each result's verdict. A run that timed out or never started always
/// fails, whatever the parser makes of its output.
///
/// # Arguments
/// * `runs` - The finished runs of one cycle
/// * `sink` - Where the report lines go
///
/// # Returns
/// The per-suite outcomes and the overall verdict
pub fn report_results(runs: &mut [SuiteRun], sink: &dyn ReportSink) -> RunSummary {
    let mut summary = RunSummary::default();

    for run in runs.iter_mut() {
        let parser = run.suite.parser.as_ref();
        let passed = verdict(parser, &run.result);
        run.result.set_passed(passed);

        let report = SuiteReport {
            name: run.suite.name.clone(),
            short_name: run.suite.short_name.clone(),
            passed,
            num_passed: count(parser, &run.result, "passed", |c, r| c.num_passed(r)),
            num_failed: count(parser, &run.result, "failed", |c, r| c.num_failed(r)),
            num_total: count(parser, &run.result, "total", |c, r| c.num_total(r)),
        };

        if passed {
            let counts = report
                .num_passed
                .map(|n| format!(" {n}"))
                .unwrap_or_default();
            sink.emit(ReportLine::success(t!(
                "report.passed",
                name = report.short_name,
                counts = counts
            )));
        } else {
            sink.emit(ReportLine::failure(t!(
                "report.failed",
                name = report.short_name,
                counts = failure_counts(&report)
            )));
            let output = run.result.output();
            if !output.trim().is_empty() {
                sink.emit(ReportLine::output(output.trim_end()).indented(1));
            }
        }

        summary.reports.push(report);
    }

    if summary.all_passed() {
        sink.emit(ReportLine::success(t!("report.all_passed")));
    } else {
        sink.emit(ReportLine::failure(t!("report.tests_failed")));
    }
    summary
}

fn verdict(parser: &dyn ResultParser, result: &RunResult) -> bool {
    if result.timed_out() || result.spawn_error().is_some() {
        return false;
    }
    parser.tests_passed(result)
}

/// `" <F> of <T>"`, `" <F>"` or `" some"`.
fn failure_counts(report: &SuiteReport) -> String {
    match report.num_failed {
        Some(failed) => {
            let of_total = report
                .num_total
                .map(|total| t!("report.of_total", total = total).to_string())
                .unwrap_or_default();
            format!(" {failed}{of_total}")
        }
        None => format!(" {}", t!("report.some")),
    }
}

/// Runs one counting method, logging and swallowing its error.
fn count(
    parser: &dyn ResultParser,
    result: &RunResult,
    what: &str,
    method: impl Fn(&dyn TestCounter, &RunResult) -> Result<usize, CountError>,
) -> Option<usize> {
    let counter = parser.counter()?;
    match method(counter, result) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(parser = parser.name(), count = what, error = %e, "could not count tests");
            None
        }
    }
}

//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! Runs resolved suites as child processes and collects one [`RunResult`]
//! per suite. Suites run concurrently, one task each, unless verbose mode
//! asks for them one at a time with live output.
//!
//! A run can be cancelled through its token at any point: every child still
//! running is killed and reaped, and the caller gets [`RunCancelled`]
//! instead of partial results.
//!
//! 将解析后的套件作为子进程运行，并为每个套件收集一个结果。
//! 套件默认并发运行，详细模式下逐个运行并实时输出。
//! 运行可随时通过令牌取消：所有仍在运行的子进程都会被终止并回收。

use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{models::RunResult, registry::TestSuite},
    infra::{
        command::{self, CaptureEnd, CaptureOptions},
        t,
    },
    reporting::{report_results, ReportLine, ReportSink, RunSummary},
};

/// The run was cancelled before every suite finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("test run cancelled")]
pub struct RunCancelled;

/// How suites are executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionOptions {
    /// Run suites one at a time and mirror their output to stdout.
    pub verbose: bool,
}

/// A suite paired with the result of running it once.
#[derive(Debug)]
pub struct SuiteRun {
    pub suite: Arc<TestSuite>,
    pub result: RunResult,
}

/// Runs every suite and waits for all of them.
///
/// # Arguments
/// * `suites` - The suites to run
/// * `options` - Execution mode
/// * `cancel` - Cancelling it kills every running child
///
/// # Returns
/// One run per suite, in the order given, or [`RunCancelled`]
pub async fn run_suites(
    suites: &[Arc<TestSuite>],
    options: ExecutionOptions,
    cancel: &CancellationToken,
) -> Result<Vec<SuiteRun>, RunCancelled> {
    let runs = if options.verbose {
        let mut runs = Vec::with_capacity(suites.len());
        for suite in suites {
            if cancel.is_cancelled() {
                return Err(RunCancelled);
            }
            runs.push(run_suite(Arc::clone(suite), true, cancel.clone()).await);
        }
        runs
    } else {
        let handles = suites.iter().map(|suite| {
            tokio::spawn(run_suite(Arc::clone(suite), false, cancel.clone()))
        });
        let mut runs = Vec::with_capacity(suites.len());
        for (suite, joined) in suites.iter().zip(join_all(handles).await) {
            match joined {
                Ok(run) => runs.push(run),
                Err(e) => {
                    tracing::error!(suite = %suite.name, error = %e, "suite task failed");
                    let mut result = RunResult::new();
                    result.set_spawn_error(e.to_string());
                    runs.push(SuiteRun {
                        suite: Arc::clone(suite),
                        result,
                    });
                }
            }
        }
        runs
    };

    if cancel.is_cancelled() {
        return Err(RunCancelled);
    }
    Ok(runs)
}

/// Runs one suite to completion, timeout or cancellation.
async fn run_suite(suite: Arc<TestSuite>, mirror: bool, cancel: CancellationToken) -> SuiteRun {
    let mut result = RunResult::new();
    let options = CaptureOptions {
        mirror,
        timeout: suite.timeout,
    };
    tracing::debug!(suite = %suite.name, command = %suite.command, "starting suite");

    match command::spawn_and_capture(command::shell_command(&suite.command), options, &cancel, &mut result)
        .await
    {
        Ok(CaptureEnd::Exited(code)) => {
            tracing::debug!(suite = %suite.name, ?code, "suite exited");
            result.set_exit_code(code);
        }
        Ok(CaptureEnd::TimedOut) => {
            let secs = suite.timeout.map(|d| d.as_secs()).unwrap_or_default();
            tracing::warn!(suite = %suite.name, secs, "suite timed out");
            result.mark_timed_out();
            result.append_note(&t!("run.timed_out", secs = secs));
        }
        Ok(CaptureEnd::Cancelled) => {
            tracing::debug!(suite = %suite.name, "suite cancelled");
        }
        Err(e) => {
            tracing::warn!(suite = %suite.name, error = %e, "failed to start suite");
            result.set_spawn_error(e.to_string());
            result.append_note(&t!(
                "run.spawn_failed",
                command = suite.command,
                error = e
            ));
        }
    }

    SuiteRun { suite, result }
}

/// Runs the suites and reports the results, the unit of work of one cycle.
///
/// # Returns
/// The summary, or `None` when the run was cancelled; cancelled runs are
/// never reported.
pub async fn run_and_report(
    suites: &[Arc<TestSuite>],
    options: ExecutionOptions,
    sink: &dyn ReportSink,
    cancel: &CancellationToken,
) -> Option<RunSummary> {
    sink.emit(ReportLine::plain(t!("run.header")));
    match run_suites(suites, options, cancel).await {
        Ok(mut runs) => Some(report_results(&mut runs, sink)),
        Err(RunCancelled) => {
            tracing::info!("run cancelled before reporting");
            None
        }
    }
}

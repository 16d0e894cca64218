//! # Run Command Module / 运行命令模块
//!
//! This module implements the runner's only command: load the
//! configuration, resolve the suites, then either run them once or keep
//! re-running them on file changes.
//!
//! 此模块实现运行器唯一的命令：加载配置、解析测试套件，
//! 然后运行一次，或在文件变化时持续重新运行。

use anyhow::{Context, Result};
use std::{env, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    cli::CliArgs,
    core::{
        config,
        execution::{run_and_report, ExecutionOptions},
        parser::ParserRegistry,
        registry::SuiteRegistry,
        watcher::{self, Autoreloader},
    },
    infra::t,
    reporting::{ConsoleSink, ReportLine, ReportSink},
};

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `Ok` when every executed suite passed (or nothing ran); an error for
/// configuration problems, failed suites and interrupts
pub async fn execute(args: CliArgs) -> Result<()> {
    let test_config = config::load_test_config(&args.config)?;
    if args.lang.is_none() {
        if let Some(language) = test_config.language.as_deref() {
            crate::init(Some(language));
        }
    }

    let base_dir = env::current_dir().context("Failed to read the current directory")?;
    let registry = SuiteRegistry::build(
        &test_config,
        &args.options,
        &ParserRegistry::bundled(),
        &base_dir,
    )?;

    let sink: Arc<dyn ReportSink> = Arc::new(ConsoleSink::new());
    registry.emit_detections(sink.as_ref());

    if let Some(shard) = args.options.shard.filter(|s| s.is_active()) {
        sink.emit(ReportLine::plain(t!(
            "run.shard",
            index = shard.index,
            count = shard.count,
            selected = registry.suites().len(),
            total = registry.eligible()
        )));
    }

    if registry.is_empty() {
        sink.emit(ReportLine::warning(t!("run.no_suites")));
        return Ok(());
    }

    let stop_token = setup_signal_handler(Arc::clone(&sink));
    let options = ExecutionOptions {
        verbose: args.options.verbose,
    };

    if args.options.autoreload {
        watch_and_rerun(&registry, options, sink, &stop_token).await?;
        if stop_token.is_cancelled() {
            anyhow::bail!("Interrupted");
        }
        return Ok(());
    }

    match run_and_report(registry.suites(), options, sink.as_ref(), &stop_token).await {
        None => anyhow::bail!("Interrupted"),
        Some(summary) if summary.all_passed() => Ok(()),
        Some(summary) => anyhow::bail!(
            t!(
                "run.suites_failed",
                failed = summary.failed().count(),
                total = summary.reports.len()
            )
            .to_string()
        ),
    }
}

/// Runs the suites now and again after every relevant file change, until
/// interrupted. Failures never end the loop.
async fn watch_and_rerun(
    registry: &SuiteRegistry,
    options: ExecutionOptions,
    sink: Arc<dyn ReportSink>,
    stop_token: &CancellationToken,
) -> Result<()> {
    let subscriptions = watcher::subscriptions(registry.suites());
    if subscriptions.is_empty() {
        sink.emit(ReportLine::warning(t!("watch.nothing_to_watch")));
        return Ok(());
    }

    sink.emit(ReportLine::plain(t!("watch.watching", count = subscriptions.len())));
    let reloader = Autoreloader::new(subscriptions, Arc::clone(&sink));
    let suites = registry.suites().to_vec();

    reloader
        .run(stop_token, move |cancel| {
            let suites = suites.clone();
            let sink = Arc::clone(&sink);
            async move {
                run_and_report(&suites, options, sink.as_ref(), &cancel).await;
            }
        })
        .await
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(sink: Arc<dyn ReportSink>) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                sink.emit(ReportLine::warning(t!("run.interrupted")));
                token_clone.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    token
}

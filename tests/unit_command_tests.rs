//! # Command Module Unit Tests / 命令模块单元测试
//!
//! Child process capture: output order, exit codes, timeouts, cancellation
//! and spawn failures.
//!
//! 子进程捕获：输出顺序、退出码、超时、取消、进程组终止以及启动失败。

#![cfg(unix)]

use poly_runner::core::models::RunResult;
use poly_runner::infra::command::{
    shell_command, spawn_and_capture, CaptureEnd, CaptureOptions,
};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

async fn capture(command: &str, options: CaptureOptions) -> (CaptureEnd, RunResult) {
    let mut result = RunResult::new();
    let end = spawn_and_capture(
        shell_command(command),
        options,
        &CancellationToken::new(),
        &mut result,
    )
    .await
    .expect("shell should start");
    (end, result)
}

#[cfg(test)]
mod spawn_and_capture_tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let (end, result) = capture("echo hello", CaptureOptions::default()).await;
        assert_eq!(end, CaptureEnd::Exited(Some(0)));
        assert_eq!(result.output(), "hello\n");
    }

    #[tokio::test]
    async fn test_captures_stderr_and_failure_code() {
        let (end, result) = capture("echo oops >&2; exit 3", CaptureOptions::default()).await;
        assert_eq!(end, CaptureEnd::Exited(Some(3)));
        assert_eq!(result.output(), "oops\n");
    }

    /// Sequential writes separated by pauses keep their order across the
    /// two streams.
    #[tokio::test]
    async fn test_interleaved_streams_keep_arrival_order() {
        let (_, result) = capture(
            "echo one; sleep 0.1; echo two >&2; sleep 0.1; echo three",
            CaptureOptions::default(),
        )
        .await;
        assert_eq!(result.output(), "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_large_output_is_not_truncated() {
        let (end, result) = capture(
            "i=0; while [ $i -lt 20000 ]; do echo \"line $i\"; i=$((i+1)); done",
            CaptureOptions::default(),
        )
        .await;
        assert_eq!(end, CaptureEnd::Exited(Some(0)));
        let output = result.output();
        assert_eq!(output.lines().count(), 20000);
        assert!(output.ends_with("line 19999\n"));
    }

    #[tokio::test]
    async fn test_timeout_kills_the_child() {
        let started = Instant::now();
        let options = CaptureOptions {
            mirror: false,
            timeout: Some(Duration::from_millis(200)),
        };
        let (end, result) = capture("echo started; sleep 30", options).await;
        assert_eq!(end, CaptureEnd::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(result.output().starts_with("started"));
    }

    #[tokio::test]
    async fn test_cancellation_kills_the_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let mut result = RunResult::new();
        let end = spawn_and_capture(
            shell_command("sleep 30"),
            CaptureOptions::default(),
            &cancel,
            &mut result,
        )
        .await
        .unwrap();
        assert_eq!(end, CaptureEnd::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    /// Cancelling a compound command also stops the processes the shell
    /// started: the nested shell never gets to write its marker.
    #[tokio::test]
    async fn test_cancellation_kills_the_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("grandchild-finished");
        let command = format!("sh -c 'sleep 1; touch {}'; true", marker.display());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let mut result = RunResult::new();
        let end = spawn_and_capture(
            shell_command(&command),
            CaptureOptions::default(),
            &cancel,
            &mut result,
        )
        .await
        .unwrap();
        assert_eq!(end, CaptureEnd::Cancelled);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "grandchild survived cancellation");
    }

    #[tokio::test]
    async fn test_timeout_kills_the_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("grandchild-finished");
        let command = format!("sh -c 'sleep 1; touch {}'; true", marker.display());
        let options = CaptureOptions {
            mirror: false,
            timeout: Some(Duration::from_millis(200)),
        };

        let (end, _) = capture(&command, options).await;
        assert_eq!(end, CaptureEnd::TimedOut);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "grandchild survived the timeout");
    }

    /// A background grandchild keeps the pipe open; the capture must still
    /// return shortly after the shell exits.
    #[tokio::test]
    async fn test_leaked_grandchild_does_not_hang_the_capture() {
        let started = Instant::now();
        let (end, result) = capture("sleep 30 & echo done", CaptureOptions::default()).await;
        assert_eq!(end, CaptureEnd::Exited(Some(0)));
        assert_eq!(result.output(), "done\n");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let mut result = RunResult::new();
        let outcome = spawn_and_capture(
            Command::new("/nonexistent/poly-runner-test-binary"),
            CaptureOptions::default(),
            &CancellationToken::new(),
            &mut result,
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(result.output(), "");
    }
}

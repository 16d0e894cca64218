//! # Command Execution Module / 命令执行模块
//!
//! Spawns suite commands through the platform shell and captures their
//! output. stdout and stderr are pumped by one reader task each into a
//! single channel, so chunks land in the result in arrival order without
//! any polling delay.
//!
//! On unix every child leads its own process group, and stopping a child
//! signals the whole group so compound commands leave nothing running.
//!
//! 通过平台 shell 启动套件命令并捕获其输出。
//! 每个子进程独占一个进程组，终止时整个进程组一起被终止。

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::models::RunResult;

/// How long to keep draining output after the child exited. Bounds the wait
/// on a background grandchild that inherited the pipes.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How long a terminated child gets to exit before its group is killed.
pub const KILL_GRACE: Duration = Duration::from_millis(500);

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// How a captured child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnd {
    /// The process exited; the code is `None` when a signal ended it.
    Exited(Option<i32>),
    /// The timeout elapsed and the process was killed.
    TimedOut,
    /// The cancellation token fired and the process was killed.
    Cancelled,
}

/// Options for [`spawn_and_capture`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// Copy every chunk to stdout as it arrives.
    pub mirror: bool,
    /// Kill the child when it runs longer than this.
    pub timeout: Option<Duration>,
}

/// Builds the command that runs `command_line` through the platform shell.
pub fn shell_command(command_line: &str) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    };
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

/// Spawns a command and captures its stdout and stderr into `result`.
///
/// The child is killed when `cancel` fires or `options.timeout` elapses.
/// After a normal exit the remaining output is drained before returning, so
/// `result` is complete once this resolves.
///
/// # Returns
/// How the child ended, or the spawn error. On error nothing was started.
pub async fn spawn_and_capture(
    mut cmd: Command,
    options: CaptureOptions,
    cancel: &CancellationToken,
    result: &mut RunResult,
) -> std::io::Result<CaptureEnd> {
    // The child leads its own process group so that everything it starts
    // can be signalled with it.
    #[cfg(unix)]
    cmd.process_group(0);
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    let mut group = ProcessGroup::of(&child);

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, tx.clone()));
    }
    // Only the pumps hold senders now; the channel closes when both hit EOF.
    drop(tx);

    let deadline = async {
        match options.timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut streams_open = true;
    let end = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminate(&mut child, &mut group).await;
                break CaptureEnd::Cancelled;
            }
            _ = &mut deadline => {
                terminate(&mut child, &mut group).await;
                break CaptureEnd::TimedOut;
            }
            chunk = rx.recv(), if streams_open => match chunk {
                Some(chunk) => record(result, &chunk, options.mirror),
                None => streams_open = false,
            },
            status = child.wait() => {
                // Background jobs the command left behind may outlive it.
                group.release();
                break CaptureEnd::Exited(status?.code());
            }
        }
    };

    if end != CaptureEnd::Cancelled {
        drain(&mut rx, result, options.mirror).await;
    }
    Ok(end)
}

/// Reads `reader` to EOF, forwarding each chunk.
async fn pump<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buffer[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "output stream closed with an error");
                break;
            }
        }
    }
}

/// Collects whatever is still buffered, waiting at most [`DRAIN_GRACE`]
/// for each further chunk.
async fn drain(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>, result: &mut RunResult, mirror: bool) {
    loop {
        match tokio::time::timeout(DRAIN_GRACE, rx.recv()).await {
            Ok(Some(chunk)) => record(result, &chunk, mirror),
            Ok(None) => break,
            Err(_) => {
                tracing::debug!("output still open after the process exited; giving up on it");
                break;
            }
        }
    }
}

fn record(result: &mut RunResult, chunk: &[u8], mirror: bool) {
    if mirror {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk);
        let _ = stdout.flush();
    }
    result.append(chunk);
}

/// Kills the child together with its process group and reaps it.
///
/// The group gets SIGTERM first and SIGKILL once the child has exited or
/// [`KILL_GRACE`] has passed, whichever comes first.
async fn terminate(child: &mut Child, group: &mut ProcessGroup) {
    group.signal(GroupSignal::Terminate);
    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        tracing::debug!("child ignored SIGTERM");
    }
    group.signal(GroupSignal::Kill);
    group.release();

    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "child already gone");
    }
    if let Err(e) = child.wait().await {
        tracing::warn!(error = %e, "failed to reap killed child");
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

/// The process group a spawned child leads. Dropping it while still armed
/// kills the whole group, so an abandoned capture leaves nothing behind.
#[derive(Debug)]
struct ProcessGroup {
    #[cfg(unix)]
    leader: Option<nix::unistd::Pid>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn of(child: &Child) -> Self {
        let leader = child
            .id()
            .and_then(|pid| i32::try_from(pid).ok())
            .map(nix::unistd::Pid::from_raw);
        Self { leader }
    }

    #[cfg(not(unix))]
    fn of(_child: &Child) -> Self {
        Self {}
    }

    #[cfg(unix)]
    fn signal(&self, signal: GroupSignal) {
        use nix::sys::signal::{killpg, Signal};

        let Some(leader) = self.leader else {
            return;
        };
        let signal = match signal {
            GroupSignal::Terminate => Signal::SIGTERM,
            GroupSignal::Kill => Signal::SIGKILL,
        };
        match killpg(leader, signal) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
            Err(e) => tracing::warn!(error = %e, ?signal, "failed to signal process group"),
        }
    }

    #[cfg(not(unix))]
    fn signal(&self, _signal: GroupSignal) {}

    /// Stops tracking the group; nothing is signalled on drop afterwards.
    fn release(&mut self) {
        #[cfg(unix)]
        {
            self.leader = None;
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.signal(GroupSignal::Kill);
    }
}

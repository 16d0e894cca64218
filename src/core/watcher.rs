//! # Autoreload Watcher Module / 自动重载监视器模块
//!
//! Re-runs the suites whenever a watched file changes. A change that lands
//! while a run is in flight cancels that run (killing its children) before
//! the next one starts, so at most one cycle is ever active.
//!
//! The select loop never awaits a running cycle directly: cycles run as
//! their own tasks and report completion over a channel.
//!
//! 被监视的文件发生变化时重新运行测试套件。
//! 运行期间发生的变化会先取消当前运行（终止其子进程），再开始下一次运行。

use anyhow::{Context, Result};
use glob::Pattern;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    core::registry::TestSuite,
    infra::{fs, t},
    reporting::{ReportLine, ReportSink},
};

/// Quiet period after the last relevant event before a restart.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// One suite's interest in file changes.
#[derive(Debug, Clone)]
pub struct WatchSubscription {
    pub suite: String,
    pub dir: PathBuf,
    pub pattern: Pattern,
}

impl WatchSubscription {
    pub fn matches(&self, path: &Path) -> bool {
        fs::matches_watch_glob(path, &self.dir, &self.pattern)
    }
}

/// The subscriptions of every suite that declares a watch.
pub fn subscriptions(suites: &[Arc<TestSuite>]) -> Vec<WatchSubscription> {
    suites
        .iter()
        .filter_map(|suite| {
            suite.watch.as_ref().map(|watch| WatchSubscription {
                suite: suite.name.clone(),
                dir: watch.dir.clone(),
                pattern: watch.glob.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No run in flight; waiting for a change.
    Idle,
    Running,
    /// The current run was told to stop and is being awaited.
    Cancelling,
}

struct ActiveCycle {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives run cycles from file system events.
pub struct Autoreloader {
    subscriptions: Vec<WatchSubscription>,
    sink: Arc<dyn ReportSink>,
    debounce: Duration,
    state: watch::Sender<WatchState>,
}

impl Autoreloader {
    pub fn new(subscriptions: Vec<WatchSubscription>, sink: Arc<dyn ReportSink>) -> Self {
        let (state, _) = watch::channel(WatchState::Idle);
        Self {
            subscriptions,
            sink,
            debounce: DEBOUNCE,
            state,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn subscriptions(&self) -> &[WatchSubscription] {
        &self.subscriptions
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Follows state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    /// Whether `event` should restart the run: a create, modify or remove
    /// of a path some subscription matches.
    pub fn is_relevant(&self, event: &Event) -> bool {
        let kind_matters = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        );
        kind_matters
            && event
                .paths
                .iter()
                .any(|path| self.subscriptions.iter().any(|sub| sub.matches(path)))
    }

    /// Watches every subscribed directory and runs cycles until `shutdown`
    /// fires.
    ///
    /// # Arguments
    /// * `shutdown` - Stops the loop; the current cycle is cancelled first
    /// * `cycle` - Builds one run cycle bound to the given token
    pub async fn run<F, Fut>(&self, shutdown: &CancellationToken, cycle: F) -> Result<()>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        })
        .context("Failed to create file watcher")?;

        let mut dirs: Vec<&Path> = self.subscriptions.iter().map(|s| s.dir.as_path()).collect();
        dirs.sort();
        dirs.dedup();
        for dir in dirs {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;
            tracing::debug!(dir = %dir.display(), "watching");
        }

        self.run_with_events(rx, shutdown, cycle).await;
        drop(watcher);
        Ok(())
    }

    /// The event loop behind [`Autoreloader::run`], fed from any source.
    ///
    /// Returns once `shutdown` fires, or once the event source closes and the
    /// current cycle has finished.
    pub async fn run_with_events<F, Fut>(
        &self,
        mut events: mpsc::UnboundedReceiver<Event>,
        shutdown: &CancellationToken,
        mut cycle: F,
    ) where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<u64>();
        let mut generation = 0u64;
        let mut current = Some(self.start_cycle(&mut cycle, shutdown, generation, &done_tx));
        let mut restart_at: Option<Instant> = None;
        let mut events_open = true;

        loop {
            let deadline = restart_at.unwrap_or_else(Instant::now);
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    if let Some(active) = current.take() {
                        self.cancel_cycle(active).await;
                    }
                    self.state.send_replace(WatchState::Idle);
                    return;
                }
                Some(finished) = done_rx.recv() => {
                    if current.as_ref().is_some_and(|a| a.generation == finished) {
                        current = None;
                        self.state.send_replace(WatchState::Idle);
                        self.sink.emit(ReportLine::muted(t!("watch.waiting")));
                    }
                }
                _ = tokio::time::sleep_until(deadline), if restart_at.is_some() => {
                    restart_at = None;
                    if let Some(active) = current.take() {
                        self.cancel_cycle(active).await;
                    }
                    generation += 1;
                    current = Some(self.start_cycle(&mut cycle, shutdown, generation, &done_tx));
                }
                event = events.recv(), if events_open => match event {
                    Some(event) if self.is_relevant(&event) => {
                        if restart_at.is_none() {
                            let path = event.paths.first().map(|p| p.display().to_string()).unwrap_or_default();
                            self.sink.emit(ReportLine::warning(t!("watch.change", path = path)));
                        }
                        restart_at = Some(Instant::now() + self.debounce);
                    }
                    Some(event) => tracing::trace!(?event, "ignoring file event"),
                    None => {
                        tracing::debug!("file event source closed");
                        events_open = false;
                    }
                },
            }

            if !events_open && restart_at.is_none() && current.is_none() {
                return;
            }
        }
    }

    fn start_cycle<F, Fut>(
        &self,
        cycle: &mut F,
        shutdown: &CancellationToken,
        generation: u64,
        done: &mpsc::UnboundedSender<u64>,
    ) -> ActiveCycle
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = shutdown.child_token();
        let run = cycle(token.clone());
        let done = done.clone();
        let handle = tokio::spawn(async move {
            run.await;
            let _ = done.send(generation);
        });
        self.state.send_replace(WatchState::Running);
        tracing::debug!(generation, "run cycle started");
        ActiveCycle {
            generation,
            token,
            handle,
        }
    }

    async fn cancel_cycle(&self, active: ActiveCycle) {
        self.state.send_replace(WatchState::Cancelling);
        active.token.cancel();
        if let Err(e) = active.handle.await {
            tracing::warn!(error = %e, generation = active.generation, "run cycle task failed");
        }
        self.state.send_replace(WatchState::Idle);
    }
}

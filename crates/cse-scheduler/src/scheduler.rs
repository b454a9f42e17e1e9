//! Named task registry with cancel-then-restart semantics.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error};

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Registry of named background tasks.
///
/// Callbacks must not call back into the scheduler under their own name;
/// `stop` and a restart join the running invocation and would deadlock on
/// themselves.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<String, RunningTask>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a periodic worker.
    ///
    /// `callback` runs every `period`; returning `false` retires the worker.
    /// With `run_immediately` the first invocation happens right away on the
    /// spawned task, then the interval applies. A previous instance under the
    /// same name is stopped and joined before the replacement spawns, so at
    /// most one invocation per name is ever in flight.
    pub async fn start_worker<F, Fut>(
        &self,
        name: &str,
        period: Duration,
        run_immediately: bool,
        callback: F,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send,
    {
        self.stop(name).await;
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            if run_immediately && !callback().await {
                debug!(worker = %task_name, "worker retired after first run");
                return;
            }
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a fresh interval completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !callback().await {
                            debug!(worker = %task_name, "worker retired");
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!(worker = %task_name, "worker stopped");
                        break;
                    }
                }
            }
        });
        self.insert(name, RunningTask { shutdown, handle }).await;
    }

    /// Start (or restart) a one-shot actor firing after `delay`.
    ///
    /// `Duration::ZERO` fires immediately (still on the spawned task). Once
    /// the callback has started it always runs to completion, even if the
    /// actor is stopped meanwhile. A previous instance under the same name is
    /// stopped and joined before the replacement spawns.
    pub async fn start_actor<F, Fut>(&self, name: &str, delay: Duration, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.stop(name).await;
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    debug!(actor = %task_name, "actor firing");
                    callback().await;
                }
                _ = shutdown_rx.changed() => {
                    debug!(actor = %task_name, "actor cancelled before firing");
                }
            }
        });
        self.insert(name, RunningTask { shutdown, handle }).await;
    }

    /// Start (or restart) a one-shot actor firing at an absolute instant.
    pub async fn start_actor_at<F, Fut>(&self, name: &str, at: Instant, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let delay = at.saturating_duration_since(Instant::now());
        self.start_actor(name, delay, callback).await;
    }

    /// Stop the named task, waiting for any in-flight invocation to finish.
    ///
    /// Idempotent; returns whether a task was actually registered.
    pub async fn stop(&self, name: &str) -> bool {
        let task = self.tasks.lock().await.remove(name);
        match task {
            Some(task) => {
                Self::halt(name, task).await;
                true
            }
            None => false,
        }
    }

    /// Stop every task and join them all.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, RunningTask)> = self.tasks.lock().await.drain().collect();
        for (name, task) in drained {
            Self::halt(&name, task).await;
        }
    }

    /// Whether a task with this name is registered and still running.
    pub async fn is_running(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .await
            .get(name)
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Number of registered tasks that have not finished.
    pub async fn active_count(&self) -> usize {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    async fn insert(&self, name: &str, task: RunningTask) {
        if let Some(stale) = self.tasks.lock().await.insert(name.to_string(), task) {
            // Two concurrent starts raced on the name; the later insert wins.
            Self::halt(name, stale).await;
        }
    }

    async fn halt(name: &str, task: RunningTask) {
        let _ = task.shutdown.send(true);
        if let Err(join_err) = task.handle.await {
            if join_err.is_panic() {
                error!(task = %name, error = %join_err, "background task panicked");
            }
        }
    }
}

//! Serialized task queue and background worker.
//!
//! One dedicated background task consumes a strict-FIFO queue; at most
//! one task runs at any instant. Enqueues are non-blocking appends from
//! any number of concurrent callers, and the status surface is safe to
//! poll at any rate. A failing (or panicking) handler marks only its
//! own task failed; the worker loop never dies.

pub mod task;

pub use task::{TaskHandle, TaskKind, TaskSnapshot, TaskStatus};

use crate::config::{dir_setting_key, MODEL_TYPES};
use crate::error::{MirrorError, Result};
use crate::library::{download_version, scan_directory, SyncContext};
use crate::network::ProgressFn;
use futures::FutureExt;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use task::Task;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Stored history bound; only the most recent entries are exposed.
const HISTORY_CAP: usize = 32;

/// Number of history entries exposed through the status surface.
const HISTORY_EXPOSED: usize = 5;

/// Point-in-time view of the queue for pollers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    /// The running task, if any.
    pub current: Option<TaskSnapshot>,
    /// Number of tasks still waiting.
    pub queue_length: usize,
    /// The last finished tasks in completion order, oldest first.
    pub recent_history: Vec<TaskSnapshot>,
}

struct QueueState {
    queue: VecDeque<Task>,
    current: Option<TaskSnapshot>,
    history: VecDeque<TaskSnapshot>,
}

/// The background synchronization queue.
///
/// Construct once with [`TaskQueue::start`] and share the returned
/// `Arc` with everything that needs to enqueue or poll. There is no
/// global instance.
pub struct TaskQueue {
    ctx: SyncContext,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl TaskQueue {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn start(ctx: SyncContext) -> Arc<Self> {
        let queue = Arc::new(Self {
            ctx,
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                current: None,
                history: VecDeque::new(),
            }),
            notify: Notify::new(),
        });

        let worker = queue.clone();
        tokio::spawn(async move {
            worker.worker_loop().await;
        });
        info!("Task queue worker started");

        queue
    }

    /// Enqueue a download task. Non-blocking.
    pub fn enqueue_download(
        &self,
        model_id: i64,
        version_id: i64,
        api_key: Option<String>,
    ) -> TaskHandle {
        self.enqueue(Task::new(
            TaskKind::Download {
                model_id,
                version_id,
            },
            api_key,
        ))
    }

    /// Enqueue a full scan of every configured directory. Non-blocking.
    pub fn enqueue_scan(&self, api_key: Option<String>) -> TaskHandle {
        self.enqueue(Task::new(TaskKind::Scan, api_key))
    }

    /// Current worker status: running task, queue depth, and the last
    /// five finished tasks. Safe to poll from any task at any rate.
    pub fn status(&self) -> QueueStatus {
        let state = self.state.lock().expect("queue state poisoned");
        let history_len = state.history.len();
        QueueStatus {
            current: state.current.clone(),
            queue_length: state.queue.len(),
            recent_history: state
                .history
                .iter()
                .skip(history_len.saturating_sub(HISTORY_EXPOSED))
                .cloned()
                .collect(),
        }
    }

    /// Wait until the queue is empty and no task is running.
    ///
    /// Poll-based; intended for embedders that need a quiescent point
    /// (shutdown, tests).
    pub async fn wait_until_idle(&self) {
        loop {
            {
                let state = self.state.lock().expect("queue state poisoned");
                if state.queue.is_empty() && state.current.is_none() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn enqueue(&self, task: Task) -> TaskHandle {
        let handle = task.handle();
        {
            let mut state = self.state.lock().expect("queue state poisoned");
            state.queue.push_back(task);
        }
        self.notify.notify_one();
        handle
    }

    async fn worker_loop(self: Arc<Self>) {
        loop {
            let task = loop {
                // Pop and publish the Running snapshot under one lock:
                // a task must never be invisible to status() or
                // wait_until_idle() between leaving the queue and
                // becoming current.
                let popped = {
                    let mut state = self.state.lock().expect("queue state poisoned");
                    let task = state.queue.pop_front();
                    if let Some(task) = &task {
                        state.current =
                            Some(task.snapshot(TaskStatus::Running, 0, "Starting...".to_string()));
                    }
                    task
                };
                match popped {
                    Some(task) => break task,
                    None => self.notify.notified().await,
                }
            };

            info!("Worker picked up task {} ({:?})", task.id, task.kind);

            // A panicking handler must not take the worker down; it is
            // converted into a failed task like any other error.
            let outcome = AssertUnwindSafe(self.run_task(&task))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(MirrorError::Other(panic_message(panic))));

            let (status, progress, message) = match outcome {
                Ok(message) => {
                    info!("Task {} completed: {}", task.id, message);
                    (TaskStatus::Completed, 100, message)
                }
                Err(e) => {
                    error!("Task {} failed: {}", task.id, e);
                    (TaskStatus::Failed, 0, e.to_string())
                }
            };

            let mut state = self.state.lock().expect("queue state poisoned");
            state.current = None;
            state.history.push_back(task.snapshot(status, progress, message));
            while state.history.len() > HISTORY_CAP {
                state.history.pop_front();
            }
        }
    }

    /// Progress callback that feeds the running task's snapshot.
    ///
    /// Progress is clamped monotone within the run; a missing message
    /// becomes a generic processing line.
    fn progress_fn(self: &Arc<Self>) -> ProgressFn {
        let queue = self.clone();
        Arc::new(move |pct: u8, msg: Option<&str>| {
            let mut state = queue.state.lock().expect("queue state poisoned");
            if let Some(current) = state.current.as_mut() {
                current.progress = current.progress.max(pct);
                current.message = match msg {
                    Some(m) => m.to_string(),
                    None => format!("Processing... {}%", pct),
                };
            }
        })
    }

    async fn run_task(self: &Arc<Self>, task: &Task) -> Result<String> {
        let progress = self.progress_fn();
        let api_key = task.api_key.as_deref();

        match &task.kind {
            TaskKind::Download {
                model_id,
                version_id,
            } => {
                let name = download_version(
                    &self.ctx,
                    *model_id,
                    *version_id,
                    api_key,
                    Some(&progress),
                    &task.cancel,
                )
                .await?;
                Ok(format!("Successfully downloaded {}", name))
            }
            TaskKind::Scan => self.run_scan(task, api_key, &progress).await,
        }
    }

    /// Run the reconciler over every configured directory, then prune
    /// records not rediscovered.
    ///
    /// Pruning is scoped to the types actually scanned in this task, so
    /// records belonging to unconfigured types are never deleted by a
    /// scan that could not have observed their files.
    async fn run_scan(
        self: &Arc<Self>,
        task: &Task,
        api_key: Option<&str>,
        progress: &ProgressFn,
    ) -> Result<String> {
        let mut scanned_types: HashSet<&str> = HashSet::new();
        let mut total_updated = 0usize;
        let mut found: HashSet<(i64, i64)> = HashSet::new();

        for model_type in MODEL_TYPES {
            let directory = match self.ctx.store.get_setting(&dir_setting_key(model_type))? {
                Some(dir) if !dir.is_empty() => std::path::PathBuf::from(dir),
                _ => continue,
            };

            task.cancel.check()?;
            progress(0, Some(&format!("Scanning {} directory...", model_type)));

            let outcome = scan_directory(
                &self.ctx,
                &directory,
                model_type,
                api_key,
                Some(progress),
                &task.cancel,
            )
            .await?;

            total_updated += outcome.updated;
            found.extend(outcome.found);
            scanned_types.insert(model_type);
        }

        let mut removed = 0usize;
        for record in self.ctx.store.list_all()? {
            if scanned_types.contains(record.model_type.as_str())
                && !found.contains(&record.pair())
            {
                warn!(
                    "Pruning record for missing pair ({}, {})",
                    record.model_id, record.version_id
                );
                if self.ctx.store.delete(record.model_id, record.version_id)? {
                    removed += 1;
                }
            }
        }

        Ok(format!(
            "Scan complete. Updated {} models. Removed {} missing models.",
            total_updated, removed
        ))
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task handler panicked".to_string()
    }
}

//! Task types and the read-only status surface.

use crate::cancel::CancellationToken;
use serde::Serialize;
use uuid::Uuid;

/// What a queued task does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TaskKind {
    /// Download one model version with its sidecars.
    Download { model_id: i64, version_id: i64 },
    /// Reconcile every configured directory against the catalog.
    Scan,
}

/// Task lifecycle. Terminal states are final; there is no retry
/// transition — a caller re-enqueues instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Read-only copy of a task's state, safe to hand to any poller.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: String,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// 0-100, monotonically non-decreasing within a run.
    pub progress: u8,
    /// Current-step or terminal-outcome description.
    pub message: String,
}

/// Caller-side handle for an enqueued task.
///
/// Cancellation is cooperative: the worker observes it between steps,
/// never mid-chunk, and the task then terminates as failed.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: String,
    cancel: CancellationToken,
}

impl TaskHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request cancellation at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Worker-owned task state.
pub(crate) struct Task {
    pub(crate) id: String,
    pub(crate) kind: TaskKind,
    pub(crate) api_key: Option<String>,
    pub(crate) cancel: CancellationToken,
}

impl Task {
    pub(crate) fn new(kind: TaskKind, api_key: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            api_key,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.id.clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub(crate) fn snapshot(&self, status: TaskStatus, progress: u8, message: String) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            kind: self.kind.clone(),
            status,
            progress,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::new(TaskKind::Scan, None);
        let b = Task::new(TaskKind::Scan, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_handle_shares_cancel_state() {
        let task = Task::new(
            TaskKind::Download {
                model_id: 1,
                version_id: 2,
            },
            Some("key".into()),
        );
        let handle = task.handle();
        assert_eq!(handle.id(), task.id);

        handle.cancel();
        assert!(task.cancel.is_cancelled());
    }

    #[test]
    fn test_snapshot_serializes() {
        let task = Task::new(
            TaskKind::Download {
                model_id: 1,
                version_id: 2,
            },
            None,
        );
        let snap = task.snapshot(TaskStatus::Queued, 0, "Queued".into());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["kind"], serde_json::json!("download"));
        assert_eq!(json["model_id"], serde_json::json!(1));
        assert_eq!(json["status"], serde_json::json!("queued"));
    }
}

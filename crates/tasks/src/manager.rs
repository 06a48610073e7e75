// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task manager: registry plus worker pool.
//!
//! Submitted closures run on the tokio blocking pool behind a semaphore
//! bounding concurrency. The registry mutex is never held across an
//! await; completion callbacks fire outside it, serialized so they
//! observe terminal transitions in termination order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sf_core::{Clock, IdMint, RandomIds};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{TaskId, TaskRecord, TaskState, TaskType};

/// Work submitted to the pool. The error string becomes the task's
/// `error` field on failure.
pub type TaskFn = Box<dyn FnOnce() -> Result<serde_json::Value, String> + Send + 'static>;

type CompletionCallback = Box<dyn Fn(&TaskRecord) + Send + Sync>;

/// Errors from task manager operations.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task already exists: {0}")]
    DuplicateTask(TaskId),
}

struct TaskEntry {
    task_type: TaskType,
    state: TaskState,
    progress: f64,
    meta: HashMap<String, serde_json::Value>,
    result: Option<serde_json::Value>,
    error: Option<String>,
    created_at: f64,
    started_at: Option<f64>,
    completed_at: Option<f64>,
    handle: Option<JoinHandle<()>>,
}

impl TaskEntry {
    fn to_record(&self, task_id: TaskId) -> TaskRecord {
        TaskRecord {
            task_id,
            task_type: self.task_type,
            state: self.state,
            progress: self.progress,
            meta: self.meta.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

struct ManagerShared {
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
    callbacks: Mutex<Vec<CompletionCallback>>,
    workers: Arc<Semaphore>,
    clock: Arc<dyn Clock>,
    max_history: usize,
}

impl ManagerShared {
    fn finish(
        &self,
        task_id: &TaskId,
        outcome: Result<Result<serde_json::Value, String>, tokio::task::JoinError>,
    ) {
        let record = {
            let mut tasks = self.tasks.lock();
            let Some(entry) = tasks.get_mut(task_id) else {
                return;
            };
            // A concurrent cancel already owns the terminal transition.
            if entry.state != TaskState::Running {
                return;
            }
            match outcome {
                Ok(Ok(result)) => {
                    entry.state = TaskState::Completed;
                    entry.progress = 100.0;
                    entry.result = Some(result);
                    info!(task = %task_id.short(8), "task completed");
                }
                Ok(Err(message)) => {
                    entry.state = TaskState::Failed;
                    entry.error = Some(message.clone());
                    error!(task = %task_id.short(8), error = %message, "task failed");
                }
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        "task panicked".to_string()
                    } else {
                        "task aborted".to_string()
                    };
                    entry.state = TaskState::Failed;
                    entry.error = Some(message.clone());
                    error!(task = %task_id.short(8), error = %message, "task failed");
                }
            }
            entry.completed_at = Some(self.clock.epoch_secs());
            entry.to_record(task_id.clone())
        };
        self.fire_callbacks(&record);
        self.prune_history();
    }

    fn fire_callbacks(&self, record: &TaskRecord) {
        // Holding the callback lock serializes notifications, so
        // listeners observe terminal transitions in termination order.
        let callbacks = self.callbacks.lock();
        for callback in callbacks.iter() {
            callback(record);
        }
    }

    fn prune_history(&self) {
        let mut tasks = self.tasks.lock();
        let mut terminal: Vec<(TaskId, f64)> = tasks
            .iter()
            .filter(|(_, e)| e.state.is_terminal())
            .map(|(id, e)| (id.clone(), e.completed_at.unwrap_or(0.0)))
            .collect();
        if terminal.len() <= self.max_history {
            return;
        }
        terminal.sort_by(|a, b| a.1.total_cmp(&b.1));
        let excess = terminal.len() - self.max_history;
        for (id, _) in terminal.into_iter().take(excess) {
            tasks.remove(&id);
        }
    }
}

/// In-process background job manager.
#[derive(Clone)]
pub struct TaskManager {
    shared: Arc<ManagerShared>,
    ids: RandomIds,
}

impl TaskManager {
    /// Defaults: 4 concurrent workers, 500 retained terminal records.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(4, 500, clock)
    }

    pub fn with_limits(max_workers: usize, max_history: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                tasks: Mutex::new(HashMap::new()),
                callbacks: Mutex::new(Vec::new()),
                workers: Arc::new(Semaphore::new(max_workers.max(1))),
                clock,
                max_history: max_history.max(1),
            }),
            ids: RandomIds,
        }
    }

    /// Submit a closure for background execution. Returns the task id.
    pub fn submit(
        &self,
        task_type: TaskType,
        func: TaskFn,
        meta: HashMap<String, serde_json::Value>,
    ) -> Result<TaskId, TaskError> {
        self.submit_with_id(TaskId::new(self.ids.mint()), task_type, func, meta)
    }

    /// Submit with a caller-chosen id. Duplicate ids fail.
    pub fn submit_with_id(
        &self,
        task_id: TaskId,
        task_type: TaskType,
        func: TaskFn,
        meta: HashMap<String, serde_json::Value>,
    ) -> Result<TaskId, TaskError> {
        {
            let mut tasks = self.shared.tasks.lock();
            if tasks.contains_key(&task_id) {
                return Err(TaskError::DuplicateTask(task_id));
            }
            tasks.insert(
                task_id.clone(),
                TaskEntry {
                    task_type,
                    state: TaskState::Queued,
                    progress: 0.0,
                    meta,
                    result: None,
                    error: None,
                    created_at: self.shared.clock.epoch_secs(),
                    started_at: None,
                    completed_at: None,
                    handle: None,
                },
            );
        }
        info!(task = %task_id.short(8), kind = %task_type, "task submitted");

        let shared = Arc::clone(&self.shared);
        let id = task_id.clone();
        let handle = tokio::spawn(async move {
            let permit = match Arc::clone(&shared.workers).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            // Claim the start; a cancel that won the race leaves nothing
            // to run.
            let proceed = {
                let mut tasks = shared.tasks.lock();
                match tasks.get_mut(&id) {
                    Some(entry) if entry.state == TaskState::Queued => {
                        entry.state = TaskState::Running;
                        entry.started_at = Some(shared.clock.epoch_secs());
                        true
                    }
                    _ => false,
                }
            };
            if !proceed {
                return;
            }

            let outcome = tokio::task::spawn_blocking(func).await;
            drop(permit);
            shared.finish(&id, outcome);
        });

        let mut tasks = self.shared.tasks.lock();
        if let Some(entry) = tasks.get_mut(&task_id) {
            entry.handle = Some(handle);
        }
        Ok(task_id)
    }

    /// Current state of a task, or `None` if unknown or pruned.
    pub fn get(&self, task_id: &TaskId) -> Option<TaskRecord> {
        let tasks = self.shared.tasks.lock();
        tasks.get(task_id).map(|e| e.to_record(task_id.clone()))
    }

    /// List tasks, newest first, optionally filtered.
    pub fn list(
        &self,
        state: Option<TaskState>,
        task_type: Option<TaskType>,
        limit: usize,
    ) -> Vec<TaskRecord> {
        let tasks = self.shared.tasks.lock();
        let mut records: Vec<TaskRecord> = tasks
            .iter()
            .filter(|(_, e)| state.map(|s| e.state == s).unwrap_or(true))
            .filter(|(_, e)| task_type.map(|t| e.task_type == t).unwrap_or(true))
            .map(|(id, e)| e.to_record(id.clone()))
            .collect();
        records.sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
        records.truncate(limit);
        records
    }

    /// Count of tasks still queued or running.
    pub fn active_count(&self) -> usize {
        let tasks = self.shared.tasks.lock();
        tasks.values().filter(|e| !e.state.is_terminal()).count()
    }

    pub fn task_count(&self) -> usize {
        self.shared.tasks.lock().len()
    }

    /// Update progress for a running task (clamped to 0–100). Returns
    /// false if the task is missing or not running.
    pub fn update_progress(&self, task_id: &TaskId, progress: f64) -> bool {
        let mut tasks = self.shared.tasks.lock();
        match tasks.get_mut(task_id) {
            Some(entry) if entry.state == TaskState::Running => {
                entry.progress = progress.clamp(0.0, 100.0);
                true
            }
            _ => false,
        }
    }

    /// Cancel a task. Returns true if the state changed; terminal tasks
    /// return false.
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        let (record, handle) = {
            let mut tasks = self.shared.tasks.lock();
            let Some(entry) = tasks.get_mut(task_id) else {
                return false;
            };
            if entry.state.is_terminal() {
                return false;
            }
            entry.state = TaskState::Cancelled;
            entry.completed_at = Some(self.shared.clock.epoch_secs());
            (entry.to_record(task_id.clone()), entry.handle.take())
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        info!(task = %task_id.short(8), "task cancelled");
        self.shared.fire_callbacks(&record);
        self.shared.prune_history();
        true
    }

    /// Remove all terminal records. Returns the count removed.
    pub fn clear_completed(&self) -> usize {
        let mut tasks = self.shared.tasks.lock();
        let before = tasks.len();
        tasks.retain(|_, e| !e.state.is_terminal());
        before - tasks.len()
    }

    /// Register a listener called once per terminal transition.
    pub fn on_task_complete(&self, callback: impl Fn(&TaskRecord) + Send + Sync + 'static) {
        self.shared.callbacks.lock().push(Box::new(callback));
    }

    /// Shut the pool down. With `wait` the call blocks until in-flight
    /// and queued tasks finish; without, they are abandoned.
    pub async fn shutdown(&self, wait: bool) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.shared.tasks.lock();
            tasks.values_mut().filter_map(|e| e.handle.take()).collect()
        };
        if wait {
            for handle in handles {
                if let Err(e) = handle.await {
                    if !e.is_cancelled() {
                        warn!(error = %e, "worker ended abnormally during shutdown");
                    }
                }
            }
        } else {
            for handle in handles {
                handle.abort();
            }
        }
        info!(wait, "task manager shut down");
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

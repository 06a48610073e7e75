// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifiers, lifecycle states, and observable snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

sf_core::string_id! {
    /// Unique identifier for a background task.
    pub struct TaskId;
}

/// Broad category of background tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Scan,
    Report,
    Workspace,
    Export,
    Generic,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Scan => write!(f, "scan"),
            TaskType::Report => write!(f, "report"),
            TaskType::Workspace => write!(f, "workspace"),
            TaskType::Export => write!(f, "export"),
            TaskType::Generic => write!(f, "generic"),
        }
    }
}

/// Task lifecycle states.
///
/// ```text
/// queued ──start──▶ running ──finish──▶ completed
///   │                 ├──error──▶ failed
///   │                 └──cancel─▶ cancelled
///   └──cancel──▶ cancelled
/// ```
///
/// Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Queued => write!(f, "queued"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Immutable snapshot of a task's state.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub state: TaskState,
    /// Progress percentage, 0–100.
    pub progress: f64,
    pub meta: HashMap<String, serde_json::Value>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Epoch seconds.
    pub created_at: f64,
    pub started_at: Option<f64>,
    pub completed_at: Option<f64>,
}

impl TaskRecord {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Seconds between start and completion (or `now` while running).
    pub fn elapsed_seconds(&self, now_epoch: f64) -> f64 {
        match self.started_at {
            Some(started) => self.completed_at.unwrap_or(now_epoch) - started,
            None => 0.0,
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    queued    = { TaskState::Queued, false },
    running   = { TaskState::Running, false },
    completed = { TaskState::Completed, true },
    failed    = { TaskState::Failed, true },
    cancelled = { TaskState::Cancelled, true },
)]
fn terminal_states(state: TaskState, expected: bool) {
    assert_eq!(state.is_terminal(), expected);
}

#[test]
fn state_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&TaskState::Cancelled).unwrap(),
        "\"cancelled\""
    );
    assert_eq!(serde_json::to_string(&TaskType::Scan).unwrap(), "\"scan\"");
}

#[test]
fn display_matches_wire_names() {
    assert_eq!(TaskState::Completed.to_string(), "completed");
    assert_eq!(TaskType::Workspace.to_string(), "workspace");
}

#[test]
fn elapsed_uses_completion_when_terminal() {
    let record = TaskRecord {
        task_id: TaskId::new("t1"),
        task_type: TaskType::Generic,
        state: TaskState::Completed,
        progress: 100.0,
        meta: HashMap::new(),
        result: None,
        error: None,
        created_at: 100.0,
        started_at: Some(110.0),
        completed_at: Some(125.0),
    };
    assert_eq!(record.elapsed_seconds(999.0), 15.0);
}

#[test]
fn elapsed_is_zero_before_start() {
    let record = TaskRecord {
        task_id: TaskId::new("t1"),
        task_type: TaskType::Generic,
        state: TaskState::Queued,
        progress: 0.0,
        meta: HashMap::new(),
        result: None,
        error: None,
        created_at: 100.0,
        started_at: None,
        completed_at: None,
    };
    assert_eq!(record.elapsed_seconds(999.0), 0.0);
}

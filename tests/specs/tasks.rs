// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle end to end.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sf_core::SystemClock;
use sf_tasks::{TaskId, TaskManager, TaskRecord, TaskState, TaskType};

async fn wait_terminal(mgr: &TaskManager, id: &TaskId) -> TaskRecord {
    for _ in 0..500 {
        if let Some(record) = mgr.get(id) {
            if record.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {id} never terminated");
}

#[tokio::test]
async fn complete_fail_and_cancel_each_fire_the_callback_once() {
    let mgr = TaskManager::new(Arc::new(SystemClock));
    let callback_states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&callback_states);
    mgr.on_task_complete(move |record| sink.lock().push(record.state));

    // Success path: queued -> running -> completed with the result.
    let ok = mgr
        .submit(
            TaskType::Scan,
            Box::new(|| {
                std::thread::sleep(Duration::from_millis(50));
                Ok(serde_json::json!({"ok": true}))
            }),
            Default::default(),
        )
        .unwrap();
    let early = mgr.get(&ok).unwrap();
    assert!(matches!(early.state, TaskState::Queued | TaskState::Running));
    let done = wait_terminal(&mgr, &ok).await;
    assert_eq!(done.state, TaskState::Completed);
    assert_eq!(done.result, Some(serde_json::json!({"ok": true})));

    // Failure path: the error string is captured on the record.
    let failed = mgr
        .submit(
            TaskType::Generic,
            Box::new(|| Err("boom".to_string())),
            Default::default(),
        )
        .unwrap();
    let done = wait_terminal(&mgr, &failed).await;
    assert_eq!(done.state, TaskState::Failed);
    assert!(done.error.as_deref().unwrap_or_default().contains("boom"));

    // Cancel path: submit and immediately cancel.
    let cancelled = mgr
        .submit(
            TaskType::Generic,
            Box::new(|| {
                std::thread::sleep(Duration::from_secs(60));
                Ok(serde_json::Value::Null)
            }),
            Default::default(),
        )
        .unwrap();
    assert!(mgr.cancel(&cancelled));
    assert_eq!(mgr.get(&cancelled).unwrap().state, TaskState::Cancelled);

    // Idempotence: a second cancel reports no state change.
    assert!(!mgr.cancel(&cancelled));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let states = callback_states.lock().clone();
    assert_eq!(states.len(), 3);
    assert!(states.contains(&TaskState::Completed));
    assert!(states.contains(&TaskState::Failed));
    assert!(states.contains(&TaskState::Cancelled));

    mgr.shutdown(false).await;
}

#[tokio::test]
async fn terminal_states_are_absorbing_over_time() {
    let mgr = TaskManager::new(Arc::new(SystemClock));
    let id = mgr
        .submit(
            TaskType::Generic,
            Box::new(|| Ok(serde_json::json!(1))),
            Default::default(),
        )
        .unwrap();

    // Observe states over time: the sequence must be monotone through
    // the lifecycle DAG.
    let mut observed = Vec::new();
    for _ in 0..200 {
        if let Some(record) = mgr.get(&id) {
            if observed.last() != Some(&record.state) {
                observed.push(record.state);
            }
            if record.is_terminal() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let rank = |s: &TaskState| match s {
        TaskState::Queued => 0,
        TaskState::Running => 1,
        TaskState::Completed | TaskState::Failed | TaskState::Cancelled => 2,
    };
    for pair in observed.windows(2) {
        assert!(rank(&pair[0]) < rank(&pair[1]), "{observed:?} regressed");
    }
    assert_eq!(observed.last(), Some(&TaskState::Completed));

    // Still completed afterwards; cancel cannot reopen it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!mgr.cancel(&id));
    assert_eq!(mgr.get(&id).unwrap().state, TaskState::Completed);
}

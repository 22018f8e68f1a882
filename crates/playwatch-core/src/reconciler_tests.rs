use super::*;
use chrono::Utc;
use parking_lot::Mutex;
use playwatch_protocols::ExecutionStatus;

fn snapshot(id: &str, status: ExecutionStatus, step: u32) -> ExecutionSnapshot {
    let mut snapshot = ExecutionSnapshot::new(id, status).with_progress(step, 10);
    if status.is_terminal() {
        snapshot.completed_at = Some(Utc::now());
    }
    snapshot
}

#[test]
fn test_first_snapshot_creates() {
    let store = ExecutionStore::new();
    let outcome = store.apply(snapshot("run-1", ExecutionStatus::Running, 0));
    assert_eq!(outcome, ApplyOutcome::Created);
    assert_eq!(store.get("run-1").unwrap().status, ExecutionStatus::Running);
    assert!(store.get("run-2").is_none());
}

#[test]
fn test_whole_snapshot_replace() {
    let store = ExecutionStore::new();
    let mut first = snapshot("run-1", ExecutionStatus::Running, 1);
    first.error = Some("transient".to_string());
    store.apply(first);

    let outcome = store.apply(snapshot("run-1", ExecutionStatus::Running, 2));
    assert_eq!(outcome, ApplyOutcome::Replaced);

    let stored = store.get("run-1").unwrap();
    assert_eq!(stored.current_step_index, 2);
    assert!(stored.error.is_none());
}

#[test]
fn test_late_snapshot_does_not_override() {
    let store = ExecutionStore::new();
    store.apply(snapshot("run-1", ExecutionStatus::Running, 3));

    let outcome = store.apply(snapshot("run-1", ExecutionStatus::Running, 2));
    assert_eq!(outcome, ApplyOutcome::Rejected(RejectReason::Regression));
    assert_eq!(store.get("run-1").unwrap().current_step_index, 3);
}

#[test]
fn test_equal_index_accepted() {
    let store = ExecutionStore::new();
    store.apply(snapshot("run-1", ExecutionStatus::Running, 2));

    let outcome = store.apply(snapshot("run-1", ExecutionStatus::Paused, 2));
    assert_eq!(outcome, ApplyOutcome::Replaced);
    assert_eq!(store.get("run-1").unwrap().status, ExecutionStatus::Paused);
}

#[test]
fn test_terminal_wins_over_higher_progress() {
    let store = ExecutionStore::new();
    store.apply(snapshot("run-1", ExecutionStatus::Running, 4));

    let outcome = store.apply(snapshot("run-1", ExecutionStatus::Failed, 1));
    assert_eq!(outcome, ApplyOutcome::Replaced);
    assert_eq!(store.get("run-1").unwrap().status, ExecutionStatus::Failed);
}

#[test]
fn test_completed_is_sticky() {
    let store = ExecutionStore::new();
    store.apply(snapshot("run-1", ExecutionStatus::Completed, 5));

    for update in [
        snapshot("run-1", ExecutionStatus::Running, 5),
        snapshot("run-1", ExecutionStatus::Running, 9),
        snapshot("run-1", ExecutionStatus::Failed, 5),
    ] {
        assert_eq!(
            store.apply(update),
            ApplyOutcome::Rejected(RejectReason::TerminalSticky)
        );
    }
    assert_eq!(store.get("run-1").unwrap().status, ExecutionStatus::Completed);
}

#[test]
fn test_step_index_never_decreases_until_terminal() {
    let store = ExecutionStore::new();
    let arrivals = [0, 2, 1, 3, 3, 2, 4, 1];
    let mut seen = Vec::new();

    for step in arrivals {
        store.apply(snapshot("run-1", ExecutionStatus::Running, step));
        seen.push(store.get("run-1").unwrap().current_step_index);
    }

    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), 4);
}

#[test]
fn test_runs_are_independent() {
    let store = ExecutionStore::new();
    store.apply(snapshot("run-a", ExecutionStatus::Completed, 5));
    assert_eq!(
        store.apply(snapshot("run-b", ExecutionStatus::Running, 0)),
        ApplyOutcome::Created
    );
    assert_eq!(store.execution_ids(), vec!["run-a", "run-b"]);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_subscribe_notified_on_accepted_only() {
    let store = ExecutionStore::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = store.subscribe("run-1", move |s| sink.lock().push(s.current_step_index));

    store.apply(snapshot("run-1", ExecutionStatus::Running, 1));
    store.apply(snapshot("run-1", ExecutionStatus::Running, 3));
    store.apply(snapshot("run-1", ExecutionStatus::Running, 2));
    store.apply(snapshot("run-other", ExecutionStatus::Running, 7));

    assert_eq!(*seen.lock(), vec![1, 3]);
}

#[test]
fn test_dropped_subscription_stops_notifications() {
    let store = ExecutionStore::new();
    let seen = Arc::new(Mutex::new(0));
    let sink = seen.clone();
    let sub = store.subscribe("run-1", move |_| *sink.lock() += 1);

    store.apply(snapshot("run-1", ExecutionStatus::Running, 1));
    drop(sub);
    store.apply(snapshot("run-1", ExecutionStatus::Running, 2));

    assert_eq!(*seen.lock(), 1);
}

#[test]
fn test_discard_forgets_run() {
    let store = ExecutionStore::new();
    let seen = Arc::new(Mutex::new(0));
    let sink = seen.clone();
    let _sub = store.subscribe("run-1", move |_| *sink.lock() += 1);
    store.apply(snapshot("run-1", ExecutionStatus::Completed, 5));

    let removed = store.discard("run-1").unwrap();
    assert_eq!(removed.status, ExecutionStatus::Completed);
    assert!(store.is_empty());

    // A fresh record starts over; old subscribers are gone.
    assert_eq!(
        store.apply(snapshot("run-1", ExecutionStatus::Running, 0)),
        ApplyOutcome::Created
    );
    assert_eq!(*seen.lock(), 1);
}

#[test]
fn test_stats() {
    let store = ExecutionStore::new();
    store.apply(snapshot("run-1", ExecutionStatus::Running, 2));
    store.apply(snapshot("run-1", ExecutionStatus::Running, 3));
    store.apply(snapshot("run-1", ExecutionStatus::Running, 1));
    store.apply(snapshot("run-1", ExecutionStatus::Cancelled, 3));
    store.apply(snapshot("run-1", ExecutionStatus::Running, 4));

    assert_eq!(
        store.stats(),
        ReconcilerStats {
            created: 1,
            replaced: 2,
            rejected_terminal: 1,
            rejected_regression: 1,
            rejected_inconsistent: 0,
        }
    );
}

#[test]
fn test_handler_may_read_store() {
    let store = Arc::new(ExecutionStore::new());
    let reader = store.clone();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let _sub = store.subscribe("run-1", move |s| {
        *sink.lock() = reader.get(&s.execution_id).map(|r| r.current_step_index);
    });

    store.apply(snapshot("run-1", ExecutionStatus::Running, 2));
    assert_eq!(*seen.lock(), Some(2));
}

#[test]
fn test_concurrent_updates_for_one_run() {
    let store = Arc::new(ExecutionStore::new());
    let handles: Vec<_> = (0..8u32)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for step in 0..50u32 {
                    let step = (step * 7 + t) % 50;
                    store.apply(
                        ExecutionSnapshot::new("run-1", ExecutionStatus::Running)
                            .with_progress(step, 50),
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get("run-1").unwrap().current_step_index, 49);
}

#[test]
fn test_step_index_beyond_total_rejected() {
    let store = ExecutionStore::new();
    let outcome =
        store.apply(ExecutionSnapshot::new("run-1", ExecutionStatus::Running).with_progress(9, 5));
    assert_eq!(outcome, ApplyOutcome::Rejected(RejectReason::Inconsistent));
    assert!(store.get("run-1").is_none());

    store.apply(snapshot("run-1", ExecutionStatus::Running, 2));
    let outcome =
        store.apply(ExecutionSnapshot::new("run-1", ExecutionStatus::Running).with_progress(6, 5));
    assert_eq!(outcome, ApplyOutcome::Rejected(RejectReason::Inconsistent));
    assert_eq!(store.get("run-1").unwrap().current_step_index, 2);
}

#[test]
fn test_terminal_without_completed_at_rejected() {
    let store = ExecutionStore::new();
    let seen = Arc::new(Mutex::new(0));
    let sink = seen.clone();
    let _sub = store.subscribe("run-1", move |_| *sink.lock() += 1);
    store.apply(snapshot("run-1", ExecutionStatus::Running, 3));

    let unfinished = ExecutionSnapshot::new("run-1", ExecutionStatus::Completed).with_progress(5, 5);
    let outcome = store.apply(unfinished);
    assert_eq!(outcome, ApplyOutcome::Rejected(RejectReason::Inconsistent));

    let stored = store.get("run-1").unwrap();
    assert_eq!(stored.status, ExecutionStatus::Running);
    assert!(!stored.is_terminal());
    assert_eq!(*seen.lock(), 1);
    assert_eq!(store.stats().rejected_inconsistent, 1);

    // The same status with a completion time goes through.
    assert_eq!(
        store.apply(snapshot("run-1", ExecutionStatus::Completed, 5)),
        ApplyOutcome::Replaced
    );
}

#[test]
fn test_racing_notifications_never_run_ahead_of_store() {
    let store = Arc::new(ExecutionStore::new());
    let reader = store.clone();
    let behind = Arc::new(Mutex::new(0u32));
    let sink = behind.clone();
    let _sub = store.subscribe("run-1", move |s| {
        let stored = reader.get("run-1").map(|r| r.current_step_index).unwrap_or(0);
        if stored < s.current_step_index {
            *sink.lock() += 1;
        }
    });

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for step in 0..40u32 {
                    let step = (step * 3 + t) % 40;
                    store.apply(
                        ExecutionSnapshot::new("run-1", ExecutionStatus::Running)
                            .with_progress(step, 40),
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Notification order across threads is unspecified, but a handler never
    // sees a snapshot newer than what `get` returns.
    assert_eq!(*behind.lock(), 0);
    assert_eq!(store.get("run-1").unwrap().current_step_index, 39);
}

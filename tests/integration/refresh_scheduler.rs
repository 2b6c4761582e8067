//! Refresh scheduler behaviour against a scripted catalog.

use std::sync::atomic::Ordering;

use chrono::{TimeZone, Utc};
use vandydine::error::ErrorKind;
use vandydine::model::MealKind;
use vandydine::scheduler::{CycleOutcome, SchedulerState};
use vandydine::service::MealFilter;
use vandydine::snapshot::{CacheSnapshot, JsonSnapshotStore, SnapshotStore};

use crate::helpers::{ScriptedSource, facilities, policy, scheduler, t, wait_for};

const UNITS: [&str; 2] = ["Rand Dining Center", "Kissam Kitchen"];

#[tokio::test]
async fn successful_cycle_publishes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    let scheduler = scheduler(&source, &dir, 3);
    assert!(scheduler.snapshot().is_empty());

    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::Published {
            facilities: 2,
            retries: 0
        }
    );
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.retry_count(), 0);
    assert_eq!(source.resets(), 2);

    let live = scheduler.snapshot();
    assert!(!live.is_empty());
    let persisted = JsonSnapshotStore::new(dir.path().join("snapshot.json"))
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(persisted, *live);

    let monday_9am = chrono::NaiveDate::from_ymd_opt(2026, 10, 12)
        .unwrap()
        .and_time(t(9, 0));
    let slot = scheduler
        .service()
        .get_menu("kissam", chrono::Weekday::Mon, &MealFilter::Next, monday_9am)
        .unwrap();
    assert_eq!(slot.kind, MealKind::Breakfast);
    assert_eq!(slot.closes_at, t(10, 0));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    // Both facilities fail on the first attempt, then recover.
    source.fail_next(2);
    let scheduler = scheduler(&source, &dir, 5);

    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::Published {
            facilities: 2,
            retries: 1
        }
    );
    assert_eq!(scheduler.snapshot().retry_count, 1);
    assert_eq!(source.menu_calls(), 4);
    assert_eq!(source.resets(), 4);
}

#[tokio::test]
async fn exhausted_retries_restore_persisted_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    // Seed the store with an older good snapshot.
    let seed_source = ScriptedSource::new(&UNITS);
    let seeded = scheduler(&seed_source, &dir, 1);
    seeded.trigger().await;
    let store = JsonSnapshotStore::new(&path);
    let original_at = Utc.with_ymd_and_hms(2026, 10, 1, 4, 0, 0).unwrap();
    let mut old = store.load().unwrap().unwrap();
    old.fetched_at = original_at;
    store.save(&old).unwrap();

    let source = ScriptedSource::new(&UNITS);
    source.fail_forever();
    let scheduler = scheduler(&source, &dir, 3);

    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::FallbackRestored {
            fetched_at: original_at
        }
    );
    let live = scheduler.snapshot();
    assert_eq!(live.fetched_at, original_at);
    assert_eq!(live.retry_count, 3);
    assert!(!live.is_empty());
    assert_eq!(scheduler.retry_count(), 3);
    assert_eq!(source.menu_calls(), 3 * 2);
}

#[tokio::test]
async fn empty_results_never_replace_published_data() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    let scheduler = scheduler(&source, &dir, 2);
    scheduler.trigger().await;
    let published = scheduler.snapshot();

    source.0.empty.store(true, Ordering::SeqCst);
    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::KeptCurrent {
            fetched_at: published.fetched_at
        }
    );
    let live = scheduler.snapshot();
    assert!(!live.is_empty());
    assert_eq!(live.fetched_at, published.fetched_at);
}

#[tokio::test]
async fn partial_failure_retries_once_data_exists() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    let scheduler = scheduler(&source, &dir, 2);

    // Nothing published yet: a partial result is better than nothing.
    source.break_unit("Kissam Kitchen");
    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::Published {
            facilities: 1,
            retries: 0
        }
    );
    let first = scheduler.snapshot();
    assert!(first.facility("kissam").is_none());

    // With data live, a partial result is a failed attempt.
    let outcome = scheduler.trigger().await;
    assert!(matches!(outcome, CycleOutcome::KeptCurrent { .. }));
    assert_eq!(scheduler.snapshot().fetched_at, first.fetched_at);
}

#[tokio::test]
async fn unknown_unit_is_skipped_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&["Rand Dining Center"]);
    let scheduler = scheduler(&source, &dir, 3);

    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::Published {
            facilities: 1,
            retries: 0
        }
    );
    assert_eq!(source.menu_calls(), 2);
}

#[tokio::test]
async fn without_fallback_retries_continue_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    source.fail_forever();
    let scheduler = scheduler(&source, &dir, 2);

    let running = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.trigger().await })
    };

    assert!(wait_for(|| scheduler.retry_count() >= 4).await);
    assert!(matches!(
        scheduler.state(),
        SchedulerState::Retrying { .. } | SchedulerState::Fetching
    ));
    assert!(scheduler.snapshot().is_empty());

    scheduler.cancel_token().cancel();
    assert_eq!(running.await.unwrap(), CycleOutcome::Cancelled);
    assert!(scheduler.snapshot().is_empty());
    assert!(
        JsonSnapshotStore::new(dir.path().join("snapshot.json"))
            .load()
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn overlapping_trigger_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    source.fail_forever();
    let scheduler = scheduler(&source, &dir, 100);

    let running = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.trigger().await })
    };
    assert!(wait_for(|| scheduler.retry_count() >= 1).await);

    assert_eq!(scheduler.trigger().await, CycleOutcome::AlreadyRunning);

    scheduler.cancel_token().cancel();
    assert_eq!(running.await.unwrap(), CycleOutcome::Cancelled);
}

#[tokio::test]
async fn state_transitions_are_observable() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    source.fail_next(2);
    let scheduler = scheduler(&source, &dir, 5);
    let mut states = scheduler.subscribe_state();

    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state == SchedulerState::Idle {
                break;
            }
        }
        seen
    });

    scheduler.trigger().await;
    let seen = watcher.await.unwrap();
    assert!(seen.contains(&SchedulerState::Retrying { attempt: 1 }));
    assert_eq!(seen.last(), Some(&SchedulerState::Idle));
}

#[tokio::test]
async fn run_loop_refreshes_on_startup_and_stops_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    let mut policy = policy(3);
    policy.refresh_on_startup = true;
    let scheduler = vandydine::scheduler::RefreshScheduler::new(
        source.clone(),
        JsonSnapshotStore::new(dir.path().join("snapshot.json")),
        facilities(),
        policy,
    );
    let mut snapshots = scheduler.subscribe();

    let handle = scheduler.spawn();
    snapshots.changed().await.unwrap();
    let live: std::sync::Arc<CacheSnapshot> = snapshots.borrow().clone();
    assert!(!live.is_empty());

    scheduler.cancel_token().cancel();
    handle.await.unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test]
async fn configuration_errors_end_the_cycle_without_retrying() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    source.0.misconfigured.store(true, Ordering::SeqCst);
    let scheduler = scheduler(&source, &dir, 5);

    let outcome = scheduler.trigger().await;
    assert!(matches!(
        outcome,
        CycleOutcome::Failed {
            kind: ErrorKind::Config,
            ..
        }
    ));
    assert_eq!(source.menu_calls(), 1);
    assert_eq!(scheduler.retry_count(), 0);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(scheduler.snapshot().is_empty());
}

#[tokio::test]
async fn partial_refresh_after_restart_keeps_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let seed_source = ScriptedSource::new(&UNITS);
    let seeded = scheduler(&seed_source, &dir, 1);
    seeded.trigger().await;
    let seeded_at = seeded.snapshot().fetched_at;

    // A fresh process: live snapshot empty, complete one on disk.
    let source = ScriptedSource::new(&UNITS);
    source.break_unit("Kissam Kitchen");
    let scheduler = scheduler(&source, &dir, 2);

    let outcome = scheduler.trigger().await;
    assert_eq!(
        outcome,
        CycleOutcome::FallbackRestored {
            fetched_at: seeded_at
        }
    );
    assert!(scheduler.snapshot().facility("kissam").is_some());

    let persisted = JsonSnapshotStore::new(&path).load().unwrap().unwrap();
    assert!(persisted.facility("kissam").is_some());
    assert_eq!(persisted.fetched_at, seeded_at);
}

#[tokio::test]
async fn one_shot_policy_gives_up_without_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&UNITS);
    source.fail_forever();
    let mut one_shot = policy(3);
    one_shot.retry_until_data = false;
    let scheduler = vandydine::scheduler::RefreshScheduler::new(
        source.clone(),
        JsonSnapshotStore::new(dir.path().join("snapshot.json")),
        facilities(),
        one_shot,
    );

    let outcome = scheduler.trigger().await;
    assert_eq!(outcome, CycleOutcome::Exhausted { attempts: 3 });
    assert_eq!(source.menu_calls(), 3 * 2);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(scheduler.snapshot().is_empty());
}

//! Liveness sweep integration tests.
//!
//! The sweep refreshes the stored advisory counters; it never changes
//! what the read path derives from timestamps.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use agent_keepintouch::models::session::LivenessState;
use agent_keepintouch::supervisor::sweeper::spawn_sweeper_task;

use super::test_helpers::{check_in_request, test_supervisor, INTERVAL};

#[tokio::test]
async fn refresh_persists_missed_counters_for_idle_sessions() {
    let (supervisor, clock) = test_supervisor().await;

    supervisor
        .check_in(&check_in_request("sess-1", "agent-a"))
        .await
        .expect("check in");
    supervisor
        .check_in(&check_in_request("sess-2", "agent-b"))
        .await
        .expect("check in");

    clock.advance_secs(2 * INTERVAL + 100);
    supervisor
        .check_in(&check_in_request("sess-2", "agent-b"))
        .await
        .expect("sess-2 stays live");

    let updated = supervisor
        .refresh_missed_check_ins()
        .await
        .expect("refresh counters");
    assert_eq!(updated, 1, "only the idle session changes");

    let idle = supervisor
        .tracker()
        .session("sess-1")
        .await
        .expect("fetch session")
        .expect("session exists");
    assert_eq!(idle.missed_check_ins, 2);

    let live = supervisor
        .tracker()
        .session("sess-2")
        .await
        .expect("fetch session")
        .expect("session exists");
    assert_eq!(live.missed_check_ins, 0);

    // Nothing left to do until more time passes.
    let updated = supervisor
        .refresh_missed_check_ins()
        .await
        .expect("refresh again");
    assert_eq!(updated, 0);
}

#[tokio::test]
async fn refresh_does_not_change_derived_liveness() {
    let (supervisor, clock) = test_supervisor().await;

    supervisor
        .check_in(&check_in_request("sess-1", "agent-a"))
        .await
        .expect("check in");
    clock.advance_secs(2 * INTERVAL + 100);

    let before = supervisor.liveness("sess-1").await.expect("liveness");
    supervisor
        .refresh_missed_check_ins()
        .await
        .expect("refresh counters");
    let after = supervisor.liveness("sess-1").await.expect("liveness");

    assert_eq!(before, after);
    assert_eq!(after.state, LivenessState::Stale);
}

#[tokio::test]
async fn a_check_in_resets_a_previously_swept_counter() {
    let (supervisor, clock) = test_supervisor().await;

    supervisor
        .check_in(&check_in_request("sess-1", "agent-a"))
        .await
        .expect("check in");
    clock.advance_secs(3 * INTERVAL);
    supervisor
        .refresh_missed_check_ins()
        .await
        .expect("refresh counters");

    supervisor
        .check_in(&check_in_request("sess-1", "agent-a"))
        .await
        .expect("check in after sweep");

    let stored = supervisor
        .tracker()
        .session("sess-1")
        .await
        .expect("fetch session")
        .expect("session exists");
    assert_eq!(stored.missed_check_ins, 0);
}

#[tokio::test]
async fn sweep_task_refreshes_until_cancelled() {
    let (supervisor, clock) = test_supervisor().await;

    supervisor
        .check_in(&check_in_request("sess-1", "agent-a"))
        .await
        .expect("check in");
    clock.advance_secs(2 * INTERVAL + 100);

    let cancel = CancellationToken::new();
    let handle = spawn_sweeper_task(
        supervisor.tracker().clone(),
        Duration::from_millis(10),
        cancel.clone(),
    );

    // Give the ticker a few rounds, then stop it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    handle.await.expect("sweep task joins");

    let stored = supervisor
        .tracker()
        .session("sess-1")
        .await
        .expect("fetch session")
        .expect("session exists");
    assert_eq!(stored.missed_check_ins, 2);
}

//! Manual constraint and conflict lifecycle tests.
//!
//! Planners drag tasks around; the engine has to honor pins that
//! agree with the network, flag the ones that do not, and let both
//! states be undone.

use critpath::SchedulingStatus;

use crate::fixtures::{chain_project, EngineHarness};

/// Test: Pin later than the derived date locks the task
/// Given a chain whose last task is dragged past its computed start
/// When the move commits
/// Then the task is locked at the pinned day with no conflict
#[tokio::test]
async fn test_pin_after_derived_locks_task() {
    let harness = EngineHarness::new();
    let (_, _, pour) = chain_project(&harness).await;

    let result = harness.engine.move_task(pour, 9).await.unwrap();

    let row = result.task(&pour).unwrap();
    assert_eq!(row.status, SchedulingStatus::Locked);
    assert_eq!(row.earliest_start, 9);
    assert_eq!(row.earliest_finish, 11);
    assert!(result.conflicts.is_empty());
}

/// Test: Pin earlier than the derived date conflicts
/// Given a chain whose last task is dragged before its predecessor allows
/// When the move commits
/// Then only that task is conflicted and it keeps its derived dates
#[tokio::test]
async fn test_pin_before_derived_conflicts() {
    let harness = EngineHarness::new();
    let (mobilize, excavate, pour) = chain_project(&harness).await;

    let result = harness.engine.move_task(pour, 3).await.unwrap();

    let row = result.task(&pour).unwrap();
    assert_eq!(row.status, SchedulingStatus::Conflicted);
    assert_eq!(row.earliest_start, 5, "derived date wins over the pin");

    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].task_id, pour);
    assert!(result.conflicts[0].reason.contains("pinned start day 3"));

    // The rest of the chain is untouched by the bad pin.
    assert_eq!(
        result.task(&mobilize).unwrap().status,
        SchedulingStatus::Scheduled
    );
    assert_eq!(
        result.task(&excavate).unwrap().status,
        SchedulingStatus::Scheduled
    );
}

/// Test: Clearing a pin resolves its conflict
/// Given a task conflicted by an infeasible pin
/// When the constraint is cleared
/// Then the task returns to its derived schedule
#[tokio::test]
async fn test_clear_constraint_resolves_conflict() {
    let harness = EngineHarness::new();
    let (_, _, pour) = chain_project(&harness).await;
    harness.engine.move_task(pour, 3).await.unwrap();

    let result = harness.engine.clear_constraint(pour).await.unwrap();

    let row = result.task(&pour).unwrap();
    assert_eq!(row.status, SchedulingStatus::Scheduled);
    assert_eq!(row.earliest_start, 5);
    assert!(result.conflicts.is_empty());
}

/// Test: Pins may sit before the project epoch
/// Given an unconstrained task dragged to a negative day
/// When the move commits
/// Then the task locks at the negative start
#[tokio::test]
async fn test_negative_pin_on_source_task() {
    let harness = EngineHarness::new();
    let permits = harness.task("permits", 4).await;

    let result = harness.engine.move_task(permits.id, -3).await.unwrap();

    let row = result.task(&permits.id).unwrap();
    assert_eq!(row.status, SchedulingStatus::Locked);
    assert_eq!(row.earliest_start, -3);
    assert_eq!(row.earliest_finish, 1);
}

/// Test: Conflicts survive a plain read
/// Given a committed conflicted schedule
/// When the schedule is read back without any edit
/// Then the conflict list and status are reconstructed from storage
#[tokio::test]
async fn test_conflicts_persist_across_reads() {
    let harness = EngineHarness::new();
    let (_, _, pour) = chain_project(&harness).await;
    let committed = harness.engine.move_task(pour, 3).await.unwrap();

    let read = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();

    assert_eq!(read.conflicts, committed.conflicts);
    assert_eq!(
        read.task(&pour).unwrap().status,
        SchedulingStatus::Conflicted
    );
}

/// Test: Linking into a pinned task can conflict
/// Given a task pinned at an early day
/// When a long predecessor is linked in front of it
/// Then the link commits and the pinned task reports the conflict
#[tokio::test]
async fn test_new_link_conflicts_with_existing_pin() {
    let harness = EngineHarness::new();
    let survey = harness.task("survey", 3).await;
    let stakeout = harness.task("stakeout", 2).await;
    harness.engine.move_task(stakeout.id, 1).await.unwrap();

    harness.link(survey.id, stakeout.id).await;

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();
    let row = schedule.task(&stakeout.id).unwrap();
    assert_eq!(row.status, SchedulingStatus::Conflicted);
    assert_eq!(row.earliest_start, 3);
    assert_eq!(schedule.conflicts.len(), 1);
}

/// Test: Shortening a predecessor resolves a pin conflict
/// Given a pin that is one day too early for its predecessor
/// When the predecessor's duration shrinks to fit
/// Then the pin becomes feasible and the task locks
#[tokio::test]
async fn test_duration_edit_resolves_conflict() {
    let harness = EngineHarness::new();
    let formwork = harness.task("formwork", 3).await;
    let pour = harness.task("pour", 2).await;
    harness.link(formwork.id, pour.id).await;
    let conflicted = harness.engine.move_task(pour.id, 2).await.unwrap();
    assert_eq!(
        conflicted.task(&pour.id).unwrap().status,
        SchedulingStatus::Conflicted
    );

    let result = harness.engine.set_duration(formwork.id, 2).await.unwrap();

    let row = result.task(&pour.id).unwrap();
    assert_eq!(row.status, SchedulingStatus::Locked);
    assert_eq!(row.earliest_start, 2);
    assert!(result.conflicts.is_empty());
}

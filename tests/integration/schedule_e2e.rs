//! End-to-end scheduling tests.
//!
//! These tests drive the engine the way a planning UI would: create
//! tasks, link them, edit durations, and read back fully computed
//! schedules. Every assertion is against committed state.

use critpath::{solve, DependencyKind, ProjectStore, SchedulingStatus, TaskGraph};

use crate::fixtures::{chain_project, child_task, EngineHarness};

/// Test: Chain scheduling happy path
/// Given three tasks linked finish-to-start
/// When the schedule is read back
/// Then each task starts when its predecessor finishes and all are critical
#[tokio::test]
async fn test_single_chain_schedule() {
    let harness = EngineHarness::new();
    let (mobilize, excavate, pour) = chain_project(&harness).await;

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();

    assert_eq!(schedule.version, 5, "3 creates + 2 links = 5 commits");

    let row = schedule.task(&mobilize).unwrap();
    assert_eq!((row.earliest_start, row.earliest_finish), (0, 2));
    let row = schedule.task(&excavate).unwrap();
    assert_eq!((row.earliest_start, row.earliest_finish), (2, 5));
    let row = schedule.task(&pour).unwrap();
    assert_eq!((row.earliest_start, row.earliest_finish), (5, 7));

    for row in &schedule.tasks {
        assert!(row.is_critical, "a pure chain has no float anywhere");
        assert_eq!(row.slack_days, 0);
        assert_eq!(row.status, SchedulingStatus::Scheduled);
    }
}

/// Test: All four dependency kinds in one network
/// Given FS, SS, FF and SF links with lags
/// When the schedule is computed
/// Then every start honors its kind's constraint arithmetic
#[tokio::test]
async fn test_four_dependency_kinds_together() {
    let harness = EngineHarness::new();
    let a = harness.task("groundwork", 4).await;
    let b = harness.task("walls", 3).await;
    let c = harness.task("drainage", 5).await;
    let d = harness.task("backfill", 2).await;
    let e = harness.task("paving", 3).await;

    harness
        .link_kind(a.id, b.id, DependencyKind::FinishToStart, 0)
        .await;
    harness
        .link_kind(a.id, c.id, DependencyKind::StartToStart, 2)
        .await;
    harness
        .link_kind(b.id, d.id, DependencyKind::FinishToFinish, 1)
        .await;
    harness
        .link_kind(c.id, e.id, DependencyKind::StartToFinish, 6)
        .await;

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();

    // FS: b starts when a finishes.
    assert_eq!(schedule.task(&b.id).unwrap().earliest_start, 4);
    // SS+2: c starts two days after a starts.
    assert_eq!(schedule.task(&c.id).unwrap().earliest_start, 2);
    // FF+1: d must finish a day after b finishes (day 8).
    let row_d = schedule.task(&d.id).unwrap();
    assert_eq!(row_d.earliest_start, 6);
    assert_eq!(row_d.earliest_finish, 8);
    // SF+6: e must finish six days after c starts (day 8).
    let row_e = schedule.task(&e.id).unwrap();
    assert_eq!(row_e.earliest_start, 5);
    assert_eq!(row_e.earliest_finish, 8);

    for row in &schedule.tasks {
        assert!(row.slack_days >= 0, "no task may sit past its latest start");
    }
}

/// Test: WBS nesting and milestones
/// Given a summary task with a child and a closing milestone
/// When the schedule is computed
/// Then levels reflect nesting and the milestone's dates collapse
#[tokio::test]
async fn test_wbs_levels_and_milestone() {
    let harness = EngineHarness::new();
    let phase = harness.task("foundation phase", 5).await;
    let rebar = harness
        .engine
        .create_task(harness.project_id, child_task("tie rebar", 3, phase.id))
        .await
        .unwrap();
    let inspection = harness.milestone("inspection").await;
    harness.link(rebar.id, inspection.id).await;

    assert_eq!(phase.level, 0);
    assert_eq!(rebar.level, 1);
    assert_eq!(rebar.parent_id, Some(phase.id));

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();
    let row = schedule.task(&inspection.id).unwrap();
    assert_eq!(row.earliest_start, 3);
    assert_eq!(row.earliest_start, row.earliest_finish);
    assert_eq!(row.latest_start, row.latest_finish);
}

/// Test: Task deletion cascades through dependencies
/// Given a chain whose middle task is deleted
/// When the schedule is read back
/// Then no dependency referencing the deleted task survives
#[tokio::test]
async fn test_delete_task_cascade_updates_schedule() {
    let harness = EngineHarness::new();
    let (mobilize, excavate, pour) = chain_project(&harness).await;

    harness.engine.delete_task(excavate).await.unwrap();

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();
    assert!(
        schedule.dependencies.is_empty(),
        "both links touched the deleted task and must be gone"
    );
    assert!(schedule.task(&excavate).is_none());
    // The survivors fall back to unconstrained starts.
    assert_eq!(schedule.task(&mobilize).unwrap().earliest_start, 0);
    assert_eq!(schedule.task(&pour).unwrap().earliest_start, 0);
}

/// Test: Duration edits ripple downstream
/// Given a committed chain
/// When an upstream duration grows
/// Then every successor shifts by the difference
#[tokio::test]
async fn test_set_duration_ripples_downstream() {
    let harness = EngineHarness::new();
    let (mobilize, excavate, pour) = chain_project(&harness).await;

    let result = harness.engine.set_duration(mobilize, 4).await.unwrap();

    assert_eq!(result.task(&excavate).unwrap().earliest_start, 4);
    assert_eq!(result.task(&pour).unwrap().earliest_start, 7);
    assert_eq!(result.version, 6);
}

/// Test: Negative lag overlaps successor work
/// Given a finish-to-start link with a two-day lead
/// When the schedule is computed
/// Then the successor starts before its predecessor finishes
#[tokio::test]
async fn test_negative_lag_overlap() {
    let harness = EngineHarness::new();
    let cure = harness.task("cure", 4).await;
    let strip = harness.task("strip forms", 3).await;
    harness
        .link_kind(cure.id, strip.id, DependencyKind::FinishToStart, -2)
        .await;

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();

    let row = schedule.task(&strip.id).unwrap();
    assert_eq!(row.earliest_start, 2);
    assert_eq!(row.earliest_finish, 5);
}

/// Test: Float lives on the short branch
/// Given two branches joining at a shared successor
/// When the schedule is computed
/// Then only the longer branch is critical
#[tokio::test]
async fn test_parallel_branches_have_float() {
    let harness = EngineHarness::new();
    let start = harness.task("site prep", 1).await;
    let long = harness.task("structure", 5).await;
    let short = harness.task("fencing", 2).await;
    let end = harness.task("handover", 1).await;
    harness.link(start.id, long.id).await;
    harness.link(start.id, short.id).await;
    harness.link(long.id, end.id).await;
    harness.link(short.id, end.id).await;

    let schedule = harness
        .engine
        .get_schedule(harness.project_id)
        .await
        .unwrap();

    assert!(schedule.task(&start.id).unwrap().is_critical);
    assert!(schedule.task(&long.id).unwrap().is_critical);
    assert!(schedule.task(&end.id).unwrap().is_critical);

    let row = schedule.task(&short.id).unwrap();
    assert!(!row.is_critical);
    assert_eq!(row.slack_days, 3);
}

/// Test: Committed schedules survive serialization
/// Given a project with links and a pin
/// When its snapshot round-trips through JSON and is re-solved
/// Then every computed field matches the committed schedule
#[tokio::test]
async fn test_schedule_survives_store_roundtrip() {
    let harness = EngineHarness::new();
    let (_, _, pour) = chain_project(&harness).await;
    let committed = harness.engine.move_task(pour, 9).await.unwrap();

    let snapshot = harness
        .store
        .load(harness.project_id)
        .await
        .unwrap()
        .unwrap();
    let json = serde_json::to_string(&snapshot).expect("Failed to serialize snapshot");
    let parsed = serde_json::from_str(&json).expect("Failed to parse snapshot");
    let graph = TaskGraph::from_snapshot(parsed).unwrap();
    let resolved = solve(&graph).unwrap();

    for row in &committed.tasks {
        let entry = resolved.get(&row.id).expect("task lost in round-trip");
        assert_eq!(entry.earliest_start, row.earliest_start);
        assert_eq!(entry.earliest_finish, row.earliest_finish);
        assert_eq!(entry.latest_start, row.latest_start);
        assert_eq!(entry.latest_finish, row.latest_finish);
        assert_eq!(entry.slack_days, row.slack_days);
        assert_eq!(entry.is_critical, row.is_critical);
        assert_eq!(entry.status, row.status);
    }
}

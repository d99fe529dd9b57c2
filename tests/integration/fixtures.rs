//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Engine harnesses wired to an in-memory store and event channel
//! - Task and milestone parameter builders
//! - Prebuilt project shapes (chains) used across suites

use std::sync::Arc;
use tokio::sync::mpsc;

use critpath::{
    Dependency, DependencyKind, EngineEvent, MemoryStore, NewTask, ProjectId, ScheduleEngine,
    Task, TaskId,
};

/// An engine over a fresh in-memory store, with events captured.
///
/// The channel is sized so a whole scenario's worth of mutations can
/// run before any test starts draining.
pub struct EngineHarness {
    pub engine: ScheduleEngine,
    pub store: Arc<MemoryStore>,
    pub project_id: ProjectId,
    pub event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHarness {
    /// Create a harness with one pre-assigned project id.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let (event_tx, event_rx) = mpsc::channel(256);
        let engine = ScheduleEngine::new(store.clone()).with_events(event_tx);

        Self {
            engine,
            store,
            project_id: ProjectId::new(),
            event_rx,
        }
    }

    /// Create an ordinary task in the harness project.
    pub async fn task(&self, name: &str, days: u32) -> Task {
        self.engine
            .create_task(self.project_id, new_task(name, days))
            .await
            .expect("Failed to create task")
    }

    /// Create a milestone in the harness project.
    pub async fn milestone(&self, name: &str) -> Task {
        self.engine
            .create_task(self.project_id, new_milestone(name))
            .await
            .expect("Failed to create milestone")
    }

    /// Link two tasks finish-to-start with no lag.
    pub async fn link(&self, predecessor: TaskId, successor: TaskId) -> Dependency {
        self.link_kind(predecessor, successor, DependencyKind::FinishToStart, 0)
            .await
    }

    /// Link two tasks with an explicit kind and lag.
    pub async fn link_kind(
        &self,
        predecessor: TaskId,
        successor: TaskId,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Dependency {
        self.engine
            .create_dependency(self.project_id, predecessor, successor, kind, lag_days)
            .await
            .expect("Failed to create dependency")
    }

    /// Receive the next engine event.
    pub async fn next_event(&mut self) -> EngineEvent {
        self.event_rx.recv().await.expect("Event channel closed")
    }

    /// Discard a known number of pending events.
    pub async fn drain(&mut self, count: usize) {
        for _ in 0..count {
            self.next_event().await;
        }
    }
}

impl Default for EngineHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters for an ordinary task.
pub fn new_task(name: &str, days: u32) -> NewTask {
    NewTask {
        name: name.to_string(),
        planned_duration_days: days,
        is_milestone: false,
        parent_id: None,
    }
}

/// Parameters for a milestone.
pub fn new_milestone(name: &str) -> NewTask {
    NewTask {
        name: name.to_string(),
        planned_duration_days: 0,
        is_milestone: true,
        parent_id: None,
    }
}

/// Parameters for a task nested under a summary task.
pub fn child_task(name: &str, days: u32, parent: TaskId) -> NewTask {
    NewTask {
        name: name.to_string(),
        planned_duration_days: days,
        is_milestone: false,
        parent_id: Some(parent),
    }
}

/// Build the chain used across suites:
/// mobilize(2d) -> excavate(3d) -> pour(2d), all finish-to-start.
pub async fn chain_project(harness: &EngineHarness) -> (TaskId, TaskId, TaskId) {
    let mobilize = harness.task("mobilize", 2).await;
    let excavate = harness.task("excavate", 3).await;
    let pour = harness.task("pour", 2).await;

    harness.link(mobilize.id, excavate.id).await;
    harness.link(excavate.id, pour.id).await;

    (mobilize.id, excavate.id, pour.id)
}

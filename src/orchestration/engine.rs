//! Schedule recalculation engine.
//!
//! The engine is the write path for project schedules. Every mutation
//! follows the same shape: resolve the owning project, rebuild its
//! graph from the stored snapshot, validate and apply the edit, run a
//! full solve, and commit the result behind an optimistic version
//! check. There is no incremental recompute; a project is small enough
//! that solving it whole keeps every derived field trustworthy.
//!
//! Mutations for one project run inside a per-project critical section,
//! so two edits to the same project never interleave in-process. The
//! version check on save guards against writers outside this process;
//! when it trips, the whole load-edit-solve cycle is retried from fresh
//! state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::config::EngineConfig;
use crate::core::dependency::{Dependency, DependencyId, DependencyKind};
use crate::core::graph::TaskGraph;
use crate::core::task::{Day, ProjectId, SchedulingStatus, Task, TaskId};
use crate::core::validate;
use crate::error::{Error, Result};
use crate::orchestration::events::EngineEvent;
use crate::solver::{self, Conflict};
use crate::store::{GraphSnapshot, ProjectStore};
use crate::{cplog, cplog_debug, cplog_warn};

/// Parameters for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    /// Requested duration; validated against `is_milestone` before
    /// anything is inserted.
    pub planned_duration_days: u32,
    pub is_milestone: bool,
    pub parent_id: Option<TaskId>,
}

impl NewTask {
    fn into_task(self, project_id: ProjectId) -> Task {
        let mut task = Task::new(project_id, &self.name, self.planned_duration_days);
        task.is_milestone = self.is_milestone;
        task.parent_id = self.parent_id;
        task
    }
}

/// One row of a computed schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub earliest_start: Day,
    pub earliest_finish: Day,
    pub latest_start: Day,
    pub latest_finish: Day,
    pub slack_days: i64,
    pub is_critical: bool,
    pub status: SchedulingStatus,
}

impl From<&Task> for ScheduledTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            earliest_start: task.schedule.earliest_start,
            earliest_finish: task.schedule.earliest_finish,
            latest_start: task.schedule.latest_start,
            latest_finish: task.schedule.latest_finish,
            slack_days: task.schedule.slack_days,
            is_critical: task.schedule.is_critical,
            status: task.schedule.status,
        }
    }
}

/// The committed schedule of a project after a recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeResult {
    pub project_id: ProjectId,
    /// Version the schedule was committed at (for reads, the stored
    /// version; for previews, the version the preview was built on).
    pub version: u64,
    pub tasks: Vec<ScheduledTask>,
    pub dependencies: Vec<Dependency>,
    /// Manual pins the solver could not honor.
    pub conflicts: Vec<Conflict>,
}

impl RecomputeResult {
    fn from_graph(version: u64, graph: &TaskGraph) -> Self {
        Self::assemble(
            graph.project_id(),
            version,
            graph.tasks(),
            graph.dependencies(),
        )
    }

    fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        Self::assemble(
            snapshot.project_id,
            snapshot.version,
            snapshot.tasks.iter(),
            snapshot.dependencies.iter(),
        )
    }

    fn assemble<'a>(
        project_id: ProjectId,
        version: u64,
        tasks: impl Iterator<Item = &'a Task>,
        dependencies: impl Iterator<Item = &'a Dependency>,
    ) -> Self {
        let mut rows = Vec::new();
        let mut conflicts = Vec::new();
        for task in tasks {
            if let Some(reason) = &task.schedule.conflict {
                conflicts.push(Conflict {
                    task_id: task.id,
                    reason: reason.clone(),
                });
            }
            rows.push(ScheduledTask::from(task));
        }
        Self {
            project_id,
            version,
            tasks: rows,
            dependencies: dependencies.cloned().collect(),
            conflicts,
        }
    }

    /// Look up the row for one task.
    pub fn task(&self, id: &TaskId) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|row| &row.id == id)
    }
}

/// A single validated mutation, replayable against fresh graph state.
///
/// Created entities are built once, outside the retry loop, so a retry
/// re-applies the same ids and timestamps instead of minting new ones.
enum Edit {
    CreateTask(Task),
    DeleteTask(TaskId),
    CreateDependency(Dependency),
    DeleteDependency(DependencyId),
    MoveTask(TaskId, Day),
    ClearConstraint(TaskId),
    SetDuration(TaskId, u32),
    SetProgress(TaskId, u8),
}

/// Validate and apply one edit to a freshly loaded graph.
///
/// Nothing is mutated until every check for the edit has passed.
/// Returns the dependency ids removed by a task-deletion cascade.
fn apply_edit(graph: &mut TaskGraph, edit: &Edit) -> Result<Vec<DependencyId>> {
    match edit {
        Edit::CreateTask(task) => {
            validate::check_new_task(
                graph,
                task.parent_id.as_ref(),
                task.planned_duration_days,
                task.is_milestone,
            )?;
            graph.add_task(task.clone())?;
            Ok(Vec::new())
        }
        Edit::DeleteTask(task_id) => {
            let (_, removed) = graph.remove_task(task_id)?;
            Ok(removed.into_iter().map(|dependency| dependency.id).collect())
        }
        Edit::CreateDependency(dependency) => {
            validate::check_new_dependency(
                graph,
                &dependency.predecessor_id,
                &dependency.successor_id,
            )?;
            graph.add_dependency(dependency.clone())?;
            Ok(Vec::new())
        }
        Edit::DeleteDependency(dependency_id) => {
            graph.remove_dependency(dependency_id)?;
            Ok(Vec::new())
        }
        Edit::MoveTask(task_id, start) => {
            let task = graph
                .task_mut(task_id)
                .ok_or(Error::UnknownTask(*task_id))?;
            task.pin_start(*start);
            Ok(Vec::new())
        }
        Edit::ClearConstraint(task_id) => {
            let task = graph
                .task_mut(task_id)
                .ok_or(Error::UnknownTask(*task_id))?;
            task.clear_pin();
            Ok(Vec::new())
        }
        Edit::SetDuration(task_id, days) => {
            let milestone = graph
                .task(task_id)
                .ok_or(Error::UnknownTask(*task_id))?
                .is_milestone;
            validate::check_duration(milestone, *days)?;
            if let Some(task) = graph.task_mut(task_id) {
                task.set_duration(*days);
            }
            Ok(Vec::new())
        }
        Edit::SetProgress(task_id, percent) => {
            validate::check_progress(*percent)?;
            let task = graph
                .task_mut(task_id)
                .ok_or(Error::UnknownTask(*task_id))?;
            task.set_progress(*percent);
            Ok(Vec::new())
        }
    }
}

/// Outcome of one committed mutation.
struct Committed {
    graph: TaskGraph,
    result: RecomputeResult,
    removed_dependencies: Vec<DependencyId>,
}

/// Write path for project schedules.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Attach an
/// event channel with [`with_events`](Self::with_events) to observe
/// committed mutations.
pub struct ScheduleEngine {
    store: Arc<dyn ProjectStore>,
    /// One mutex per project; entries are created on first touch.
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
    events: Option<mpsc::Sender<EngineEvent>>,
    config: EngineConfig,
}

impl ScheduleEngine {
    /// Create an engine with default configuration.
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(store: Arc<dyn ProjectStore>, config: EngineConfig) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            events: None,
            config,
        }
    }

    /// Attach a channel that receives an event per committed mutation.
    pub fn with_events(mut self, events: mpsc::Sender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Create a task and recompute the project schedule.
    ///
    /// The first task created for an unknown project creates the
    /// project. Returns the committed task, computed dates included.
    pub async fn create_task(&self, project_id: ProjectId, new_task: NewTask) -> Result<Task> {
        let task = new_task.into_task(project_id);
        let task_id = task.id;
        let committed = self.commit(project_id, Edit::CreateTask(task)).await?;
        let task = committed
            .graph
            .task(&task_id)
            .cloned()
            .ok_or(Error::UnknownTask(task_id))?;

        cplog!(
            "Created task '{}' ({}) in project {}",
            task.name,
            task_id.short(),
            project_id.short()
        );
        self.emit(EngineEvent::TaskCreated {
            project_id,
            task: task.clone(),
        })
        .await;
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result,
        })
        .await;
        Ok(task)
    }

    /// Delete a task, cascade away every dependency touching it, and
    /// reparent its children to its own parent.
    pub async fn delete_task(&self, task_id: TaskId) -> Result<RecomputeResult> {
        let project_id = self
            .store
            .project_of_task(task_id)
            .await?
            .ok_or(Error::UnknownTask(task_id))?;
        let committed = self.commit(project_id, Edit::DeleteTask(task_id)).await?;

        cplog!(
            "Deleted task {} and {} dependent link(s) from project {}",
            task_id.short(),
            committed.removed_dependencies.len(),
            project_id.short()
        );
        self.emit(EngineEvent::TaskDeleted {
            project_id,
            task_id,
            removed_dependencies: committed.removed_dependencies.clone(),
        })
        .await;
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result.clone(),
        })
        .await;
        Ok(committed.result)
    }

    /// Link two tasks and recompute. The edge is validated (existence,
    /// self-link, duplicate pair, cycle) before anything changes.
    pub async fn create_dependency(
        &self,
        project_id: ProjectId,
        predecessor_id: TaskId,
        successor_id: TaskId,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Result<Dependency> {
        let dependency =
            Dependency::new(project_id, predecessor_id, successor_id, kind, lag_days);
        let dependency_id = dependency.id;
        let committed = self
            .commit(project_id, Edit::CreateDependency(dependency))
            .await?;
        let dependency = committed
            .graph
            .dependency(&dependency_id)
            .cloned()
            .ok_or(Error::UnknownDependency(dependency_id))?;

        cplog!(
            "Created dependency {} in project {}",
            dependency.describe(),
            project_id.short()
        );
        self.emit(EngineEvent::DependencyCreated {
            project_id,
            dependency: dependency.clone(),
        })
        .await;
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result,
        })
        .await;
        Ok(dependency)
    }

    /// Remove a dependency; both endpoint tasks remain.
    pub async fn delete_dependency(&self, dependency_id: DependencyId) -> Result<RecomputeResult> {
        let project_id = self
            .store
            .project_of_dependency(dependency_id)
            .await?
            .ok_or(Error::UnknownDependency(dependency_id))?;
        let committed = self
            .commit(project_id, Edit::DeleteDependency(dependency_id))
            .await?;

        cplog!(
            "Deleted dependency {} from project {}",
            dependency_id.short(),
            project_id.short()
        );
        self.emit(EngineEvent::DependencyDeleted {
            project_id,
            dependency_id,
        })
        .await;
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result.clone(),
        })
        .await;
        Ok(committed.result)
    }

    /// Pin a task to a start day. A pin at or after the task's
    /// dependency-derived minimum locks it there; an earlier pin is
    /// kept but reported as a conflict, and computed dates fall back to
    /// the derived minimum.
    pub async fn move_task(&self, task_id: TaskId, start: Day) -> Result<RecomputeResult> {
        let project_id = self
            .store
            .project_of_task(task_id)
            .await?
            .ok_or(Error::UnknownTask(task_id))?;
        let committed = self
            .commit(project_id, Edit::MoveTask(task_id, start))
            .await?;

        cplog!(
            "Pinned task {} to day {} in project {}",
            task_id.short(),
            start,
            project_id.short()
        );
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result.clone(),
        })
        .await;
        Ok(committed.result)
    }

    /// Remove a task's manual pin, returning it to derived dates. This
    /// is the resolution path for a conflicted pin.
    pub async fn clear_constraint(&self, task_id: TaskId) -> Result<RecomputeResult> {
        let project_id = self
            .store
            .project_of_task(task_id)
            .await?
            .ok_or(Error::UnknownTask(task_id))?;
        let committed = self
            .commit(project_id, Edit::ClearConstraint(task_id))
            .await?;

        cplog!(
            "Cleared pin on task {} in project {}",
            task_id.short(),
            project_id.short()
        );
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result.clone(),
        })
        .await;
        Ok(committed.result)
    }

    /// Change a task's planned duration and recompute everything
    /// downstream of it.
    pub async fn set_duration(&self, task_id: TaskId, days: u32) -> Result<RecomputeResult> {
        let project_id = self
            .store
            .project_of_task(task_id)
            .await?
            .ok_or(Error::UnknownTask(task_id))?;
        let committed = self
            .commit(project_id, Edit::SetDuration(task_id, days))
            .await?;

        cplog!(
            "Set duration of task {} to {} day(s) in project {}",
            task_id.short(),
            days,
            project_id.short()
        );
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result.clone(),
        })
        .await;
        Ok(committed.result)
    }

    /// Record reported progress on a task. Progress never moves dates;
    /// it rides along for reporting.
    pub async fn set_progress(&self, task_id: TaskId, percent: u8) -> Result<RecomputeResult> {
        let project_id = self
            .store
            .project_of_task(task_id)
            .await?
            .ok_or(Error::UnknownTask(task_id))?;
        let committed = self
            .commit(project_id, Edit::SetProgress(task_id, percent))
            .await?;

        cplog_debug!(
            "Set progress of task {} to {}% in project {}",
            task_id.short(),
            percent,
            project_id.short()
        );
        self.emit(EngineEvent::ScheduleRecomputed {
            project_id,
            result: committed.result.clone(),
        })
        .await;
        Ok(committed.result)
    }

    /// Read the persisted schedule for a project, exactly as last
    /// committed. No solve runs.
    pub async fn get_schedule(&self, project_id: ProjectId) -> Result<RecomputeResult> {
        let snapshot = self
            .store
            .load(project_id)
            .await?
            .ok_or(Error::UnknownProject(project_id))?;
        Ok(RecomputeResult::from_snapshot(&snapshot))
    }

    /// Solve the schedule as it would look with one extra dependency.
    ///
    /// Nothing is committed and no events are emitted; the returned
    /// result carries the version the preview was built on.
    pub async fn preview_dependency(
        &self,
        project_id: ProjectId,
        predecessor_id: TaskId,
        successor_id: TaskId,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Result<RecomputeResult> {
        let snapshot = self
            .store
            .load(project_id)
            .await?
            .ok_or(Error::UnknownProject(project_id))?;
        let version = snapshot.version;
        let mut graph = TaskGraph::from_snapshot(snapshot)?;

        validate::check_new_dependency(&graph, &predecessor_id, &successor_id)?;
        graph.add_dependency(Dependency::new(
            project_id,
            predecessor_id,
            successor_id,
            kind,
            lag_days,
        ))?;
        let schedule = solver::solve(&graph)?;
        graph.apply_schedule(&schedule.entries);

        cplog_debug!(
            "Previewed {} -> {} ({}) in project {}, nothing committed",
            predecessor_id.short(),
            successor_id.short(),
            kind,
            project_id.short()
        );
        Ok(RecomputeResult::from_graph(version, &graph))
    }

    /// Delete an entire project and its stored schedule.
    pub async fn delete_project(&self, project_id: ProjectId) -> Result<()> {
        let lock = self.project_lock(project_id).await;
        let guard = lock.lock().await;

        if self.store.load(project_id).await?.is_none() {
            return Err(Error::UnknownProject(project_id));
        }
        self.store.remove(project_id).await?;
        drop(guard);
        self.locks.lock().await.remove(&project_id);

        cplog!("Deleted project {}", project_id.short());
        self.emit(EngineEvent::ProjectDeleted { project_id }).await;
        Ok(())
    }

    /// Run one mutation through the full load-edit-solve-save cycle.
    ///
    /// Holds the project's critical section for the whole attempt. On a
    /// version mismatch the cycle restarts from freshly loaded state,
    /// up to `max_persist_retries` times.
    async fn commit(&self, project_id: ProjectId, edit: Edit) -> Result<Committed> {
        let lock = self.project_lock(project_id).await;
        let mut attempt: u32 = 0;

        loop {
            let _guard = lock.lock().await;

            let stored = self.store.load(project_id).await?;
            let expected = stored.as_ref().map_or(0, |snapshot| snapshot.version);
            let mut graph = match stored {
                Some(snapshot) => TaskGraph::from_snapshot(snapshot)?,
                None => TaskGraph::new(project_id),
            };

            let removed_dependencies = apply_edit(&mut graph, &edit)?;
            let schedule = solver::solve(&graph)?;
            graph.apply_schedule(&schedule.entries);

            if !schedule.conflicts.is_empty() {
                cplog_warn!(
                    "Project {}: {} constraint conflict(s) after recompute",
                    project_id.short(),
                    schedule.conflicts.len()
                );
            }

            let snapshot = graph.to_snapshot(expected + 1);
            match self.store.save(snapshot, expected).await {
                Ok(version) => {
                    cplog_debug!(
                        "Project {} committed at version {}: {} tasks, {} dependencies, finish day {}",
                        project_id.short(),
                        version,
                        graph.task_count(),
                        graph.dependency_count(),
                        schedule.project_finish
                    );
                    let result = RecomputeResult::from_graph(version, &graph);
                    return Ok(Committed {
                        graph,
                        result,
                        removed_dependencies,
                    });
                }
                Err(Error::ConcurrentModification { found, .. })
                    if attempt < self.config.max_persist_retries =>
                {
                    attempt += 1;
                    cplog_warn!(
                        "Project {} moved to version {} underneath us, retrying ({}/{})",
                        project_id.short(),
                        found,
                        attempt,
                        self.config.max_persist_retries
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn project_lock(&self, project_id: ProjectId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(project_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn emit(&self, event: EngineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event).await;
        }
    }
}

//! Critical-path solver.
//!
//! Pure functions over a task graph: given the current tasks and links,
//! compute earliest/latest dates, slack, the critical set, and any
//! manual-pin conflicts. Solving never mutates the graph, so callers
//! can run it speculatively and apply the result only on commit.
//!
//! The forward pass walks tasks in topological order and assigns each
//! one the tightest earliest start its incoming links and manual pin
//! allow; the backward pass walks in reverse, seeding sink tasks with
//! the project finish and propagating latest finishes through the
//! inverted link bounds. Slack falls out as the distance between the
//! two passes. Total work is linear in tasks plus links.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::graph::TaskGraph;
use crate::core::task::{Day, SchedulingStatus, TaskId, TaskSchedule};
use crate::error::Result;

/// A manual pin the solver honored structurally but could not satisfy.
///
/// Conflicts are data, not errors: the rest of the schedule is valid
/// and the pinned task keeps its dependency-derived dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub task_id: TaskId,
    pub reason: String,
}

/// Complete solved schedule for one graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    /// Computed block per task, in graph order.
    pub entries: Vec<(TaskId, TaskSchedule)>,
    /// Pins that fell before their dependency-derived minimums.
    pub conflicts: Vec<Conflict>,
    /// Day the project finishes: the maximum earliest finish over sink
    /// tasks, which also seeds the backward pass.
    pub project_finish: Day,
}

impl Schedule {
    /// Look up the computed block for one task.
    pub fn get(&self, id: &TaskId) -> Option<&TaskSchedule> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, schedule)| schedule)
    }

    /// Ids of every zero-slack task.
    pub fn critical_ids(&self) -> Vec<TaskId> {
        self.entries
            .iter()
            .filter(|(_, schedule)| schedule.is_critical)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Solve the full graph: forward pass, backward pass, slack, conflicts.
///
/// Deterministic and idempotent: the same graph always produces the
/// same schedule.
///
/// # Errors
/// Returns `CycleDetected` if the graph is not acyclic. Validated
/// graphs never are; this guards against corrupt snapshots.
pub fn solve(graph: &TaskGraph) -> Result<Schedule> {
    let order = graph.topological_order()?;
    if order.is_empty() {
        return Ok(Schedule::default());
    }

    let mut early_start: HashMap<TaskId, Day> = HashMap::with_capacity(order.len());
    let mut early_finish: HashMap<TaskId, Day> = HashMap::with_capacity(order.len());
    let mut statuses: HashMap<TaskId, (SchedulingStatus, Option<String>)> =
        HashMap::with_capacity(order.len());

    // Forward pass: tightest start each task's predecessors and pin allow.
    for id in &order {
        let Some(task) = graph.task(id) else { continue };
        let duration = task.duration();

        let mut derived: Option<Day> = None;
        for dep in graph.incoming(id) {
            let (Some(&pred_start), Some(&pred_finish)) = (
                early_start.get(&dep.predecessor_id),
                early_finish.get(&dep.predecessor_id),
            ) else {
                continue;
            };
            let bound =
                dep.kind
                    .earliest_start_bound(pred_start, pred_finish, duration, dep.lag_days);
            derived = Some(derived.map_or(bound, |current| current.max(bound)));
        }

        let (start, status, conflict) = match (derived, task.manual_constraint) {
            (None, None) => (0, SchedulingStatus::Scheduled, None),
            (Some(minimum), None) => (minimum, SchedulingStatus::Scheduled, None),
            (None, Some(pin)) => (pin, SchedulingStatus::Locked, None),
            (Some(minimum), Some(pin)) if pin >= minimum => {
                (pin, SchedulingStatus::Locked, None)
            }
            (Some(minimum), Some(pin)) => (
                minimum,
                SchedulingStatus::Conflicted,
                Some(format!(
                    "pinned start day {} is before the earliest allowed day {}",
                    pin, minimum
                )),
            ),
        };

        early_start.insert(*id, start);
        early_finish.insert(*id, start + duration);
        statuses.insert(*id, (status, conflict));
    }

    // Sinks anchor the backward pass at the project finish.
    let project_finish = order
        .iter()
        .filter(|id| graph.outgoing(id).is_empty())
        .filter_map(|id| early_finish.get(id))
        .copied()
        .max()
        .unwrap_or(0);

    let mut late_start: HashMap<TaskId, Day> = HashMap::with_capacity(order.len());
    let mut late_finish: HashMap<TaskId, Day> = HashMap::with_capacity(order.len());

    // Backward pass: loosest finish each task's successors allow.
    for id in order.iter().rev() {
        let Some(task) = graph.task(id) else { continue };
        let duration = task.duration();

        let mut bound: Option<Day> = None;
        for dep in graph.outgoing(id) {
            let (Some(&succ_start), Some(&succ_finish)) = (
                late_start.get(&dep.successor_id),
                late_finish.get(&dep.successor_id),
            ) else {
                continue;
            };
            let edge_bound =
                dep.kind
                    .latest_finish_bound(succ_start, succ_finish, duration, dep.lag_days);
            bound = Some(bound.map_or(edge_bound, |current| current.min(edge_bound)));
        }

        let finish = bound.unwrap_or(project_finish);
        late_finish.insert(*id, finish);
        late_start.insert(*id, finish - duration);
    }

    // Assemble in graph order so output is stable across recomputes.
    let mut entries = Vec::with_capacity(order.len());
    let mut conflicts = Vec::new();
    for task in graph.tasks() {
        let id = task.id;
        let (status, conflict) = statuses
            .get(&id)
            .cloned()
            .unwrap_or((SchedulingStatus::Scheduled, None));
        let earliest_start = early_start.get(&id).copied().unwrap_or(0);
        let earliest_finish = early_finish.get(&id).copied().unwrap_or(0);
        let latest_start = late_start.get(&id).copied().unwrap_or(0);
        let latest_finish = late_finish.get(&id).copied().unwrap_or(0);
        let slack_days = latest_start - earliest_start;

        if let Some(reason) = &conflict {
            conflicts.push(Conflict {
                task_id: id,
                reason: reason.clone(),
            });
        }

        entries.push((
            id,
            TaskSchedule {
                earliest_start,
                earliest_finish,
                latest_start,
                latest_finish,
                slack_days,
                is_critical: slack_days == 0,
                status,
                conflict,
            },
        ));
    }

    Ok(Schedule {
        entries,
        conflicts,
        project_finish,
    })
}

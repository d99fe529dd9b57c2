//! Task data model for the scheduling graph.
//!
//! Tasks are the planned units of work in a project. Each task carries
//! the fields a planner edits (duration, hierarchy, progress, manual
//! pin) and a computed block the solver overwrites on every recompute.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Offset in whole calendar days from the project start reference (day 0).
///
/// Signed: negative values arise legitimately from negative lag (lead)
/// arithmetic and are never clamped.
pub type Day = i64;

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Create a new unique project identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a task within a project.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new unique task identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Scheduling state of a task, assigned by the solver.
///
/// Every recompute rewrites this for every task; it is never edited
/// directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStatus {
    /// Task exists but no recompute has run over it yet.
    #[default]
    Unscheduled,
    /// Dates derived purely from dependencies and defaults.
    Scheduled,
    /// Manual pin present and honored (pin is at or after the derived minimum).
    Locked,
    /// Manual pin present but earlier than the dependency-derived minimum.
    Conflicted,
}

impl std::fmt::Display for SchedulingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulingStatus::Unscheduled => write!(f, "unscheduled"),
            SchedulingStatus::Scheduled => write!(f, "scheduled"),
            SchedulingStatus::Locked => write!(f, "locked"),
            SchedulingStatus::Conflicted => write!(f, "conflicted"),
        }
    }
}

/// Computed schedule block, overwritten wholesale by every recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchedule {
    /// Earliest day the task can start given its predecessors.
    pub earliest_start: Day,
    /// Earliest day the task can finish.
    pub earliest_finish: Day,
    /// Latest day the task can start without delaying the project finish.
    pub latest_start: Day,
    /// Latest day the task can finish without delaying the project finish.
    pub latest_finish: Day,
    /// Scheduling freedom: latest_start - earliest_start.
    pub slack_days: i64,
    /// True when slack is zero (the task is on a critical chain).
    pub is_critical: bool,
    /// Lifecycle state assigned by the last recompute.
    pub status: SchedulingStatus,
    /// Why the task is conflicted, when it is.
    pub conflict: Option<String>,
}

/// A single task in a project plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Project this task belongs to.
    pub project_id: ProjectId,
    /// Human-readable name for the task.
    pub name: String,
    /// Planned working length in days. Milestones are exactly 0,
    /// ordinary tasks at least 1.
    pub planned_duration_days: u32,
    /// Zero-duration marker event.
    pub is_milestone: bool,
    /// Parent task in the work breakdown hierarchy, if any.
    pub parent_id: Option<TaskId>,
    /// Depth in the work breakdown hierarchy (root tasks are 0). Derived
    /// from the parent chain; maintained by the graph, not edited directly.
    pub level: u32,
    /// Completion percentage, 0-100. Informational; never moves dates.
    pub progress_percent: u8,
    /// Manually pinned start day, if the planner dragged this task.
    pub manual_constraint: Option<Day>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When any planner-editable field last changed.
    pub updated_at: DateTime<Utc>,
    /// Computed dates, slack, and status from the last recompute.
    pub schedule: TaskSchedule,
}

impl Task {
    /// Create a new ordinary task with the given name and duration.
    ///
    /// The task starts unscheduled, at hierarchy root, with no pin and
    /// zero progress. Duration bounds are checked by the validator, not
    /// here.
    pub fn new(project_id: ProjectId, name: &str, planned_duration_days: u32) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            project_id,
            name: name.to_string(),
            planned_duration_days,
            is_milestone: false,
            parent_id: None,
            level: 0,
            progress_percent: 0,
            manual_constraint: None,
            created_at: now,
            updated_at: now,
            schedule: TaskSchedule::default(),
        }
    }

    /// Create a new milestone (a zero-duration marker event).
    pub fn new_milestone(project_id: ProjectId, name: &str) -> Self {
        let mut task = Self::new(project_id, name, 0);
        task.is_milestone = true;
        task
    }

    /// Duration as a signed day count for schedule arithmetic.
    pub fn duration(&self) -> Day {
        Day::from(self.planned_duration_days)
    }

    /// Replace the planned duration. Bounds are checked by the validator.
    pub fn set_duration(&mut self, days: u32) {
        self.planned_duration_days = days;
        self.touch();
    }

    /// Replace the completion percentage. Range is checked by the validator.
    pub fn set_progress(&mut self, percent: u8) {
        self.progress_percent = percent;
        self.touch();
    }

    /// Pin the task to start on the given day.
    ///
    /// The pin is kept even when it conflicts with predecessors; the
    /// solver reports the conflict instead of discarding the intent.
    pub fn pin_start(&mut self, day: Day) {
        self.manual_constraint = Some(day);
        self.touch();
    }

    /// Remove the manual pin, returning the task to pure dependency-driven
    /// scheduling on the next recompute.
    pub fn clear_pin(&mut self) {
        self.manual_constraint = None;
        self.touch();
    }

    /// Whether a manual pin is set.
    pub fn is_pinned(&self) -> bool {
        self.manual_constraint.is_some()
    }

    /// Move the task under a new parent (or to the root with `None`).
    /// Level maintenance is the graph's job.
    pub fn set_parent(&mut self, parent_id: Option<TaskId>) {
        self.parent_id = parent_id;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Map a day offset to a calendar date given the project's epoch
/// (the date of day 0).
pub fn day_to_date(epoch: NaiveDate, day: Day) -> NaiveDate {
    epoch + chrono::Duration::days(day)
}

/// Map a calendar date back to a day offset from the project's epoch.
pub fn date_to_day(epoch: NaiveDate, date: NaiveDate) -> Day {
    (date - epoch).num_days()
}

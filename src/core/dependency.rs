//! Dependency links between tasks.
//!
//! A dependency constrains when its successor may be scheduled relative
//! to its predecessor. The four precedence kinds form a closed set; each
//! kind contributes exactly one forward bound (on the successor's
//! earliest start) and one backward bound (on the predecessor's latest
//! finish). All date arithmetic layers on top of these two functions,
//! so adding a kind means adding one enum variant and its two bounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::task::{Day, ProjectId, TaskId};

/// Unique identifier for a dependency link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyId(pub Uuid);

impl DependencyId {
    /// Create a new unique dependency identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for DependencyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DependencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DependencyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Precedence relation between a predecessor and a successor task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Successor starts after the predecessor finishes (the common case).
    #[default]
    FinishToStart,
    /// Successor starts once the predecessor has started.
    StartToStart,
    /// Successor finishes once the predecessor has finished.
    FinishToFinish,
    /// Successor finishes once the predecessor has started.
    StartToFinish,
}

impl DependencyKind {
    /// Conventional two-letter planner code.
    pub fn code(&self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "FS",
            DependencyKind::StartToStart => "SS",
            DependencyKind::FinishToFinish => "FF",
            DependencyKind::StartToFinish => "SF",
        }
    }

    /// Lower bound this relation imposes on the successor's earliest
    /// start, given the predecessor's computed early dates.
    ///
    /// Finish-coupled kinds (FF, SF) constrain the successor's finish,
    /// so the successor's duration is subtracted to express the bound
    /// in start terms. Lag is signed; a negative lag is a lead.
    pub fn earliest_start_bound(
        &self,
        pred_start: Day,
        pred_finish: Day,
        succ_duration: Day,
        lag: Day,
    ) -> Day {
        match self {
            DependencyKind::FinishToStart => pred_finish + lag,
            DependencyKind::StartToStart => pred_start + lag,
            DependencyKind::FinishToFinish => pred_finish + lag - succ_duration,
            DependencyKind::StartToFinish => pred_start + lag - succ_duration,
        }
    }

    /// Upper bound this relation imposes on the predecessor's latest
    /// finish, given the successor's computed late dates.
    ///
    /// Exact inversion of [`earliest_start_bound`](Self::earliest_start_bound):
    /// start-coupled kinds (SS, SF) constrain the predecessor's start, so
    /// the predecessor's duration is added to express the bound in finish
    /// terms.
    pub fn latest_finish_bound(
        &self,
        succ_late_start: Day,
        succ_late_finish: Day,
        pred_duration: Day,
        lag: Day,
    ) -> Day {
        match self {
            DependencyKind::FinishToStart => succ_late_start - lag,
            DependencyKind::StartToStart => succ_late_start - lag + pred_duration,
            DependencyKind::FinishToFinish => succ_late_finish - lag,
            DependencyKind::StartToFinish => succ_late_finish - lag + pred_duration,
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A directed scheduling link between two tasks in the same project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Unique identifier for this link.
    pub id: DependencyId,
    /// Project both endpoints belong to.
    pub project_id: ProjectId,
    /// Task that constrains.
    pub predecessor_id: TaskId,
    /// Task being constrained.
    pub successor_id: TaskId,
    /// Which precedence relation applies.
    pub kind: DependencyKind,
    /// Signed offset in days; positive delays the successor, negative
    /// overlaps it (lead).
    pub lag_days: i64,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
}

impl Dependency {
    /// Create a new dependency link with a generated id.
    pub fn new(
        project_id: ProjectId,
        predecessor_id: TaskId,
        successor_id: TaskId,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Self {
        Self {
            id: DependencyId::new(),
            project_id,
            predecessor_id,
            successor_id,
            kind,
            lag_days,
            created_at: Utc::now(),
        }
    }

    /// Short human-readable form, e.g. `a1b2c3d4 -FS+2-> e5f6a7b8`.
    pub fn describe(&self) -> String {
        format!(
            "{} -{}{}-> {}",
            self.predecessor_id.short(),
            self.kind.code(),
            if self.lag_days >= 0 {
                format!("+{}", self.lag_days)
            } else {
                self.lag_days.to_string()
            },
            self.successor_id.short()
        )
    }
}

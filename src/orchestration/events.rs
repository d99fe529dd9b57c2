//! Events emitted by the schedule engine.

use crate::core::dependency::{Dependency, DependencyId};
use crate::core::task::{ProjectId, Task, TaskId};
use crate::orchestration::engine::RecomputeResult;

/// Events emitted after each committed mutation.
///
/// These let external components (sync layers, timeline views) react to
/// schedule changes without polling. Every mutation emits its specific
/// event followed by `ScheduleRecomputed` carrying the full updated
/// schedule; rejected mutations emit nothing.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A task was created and the schedule recomputed around it.
    TaskCreated {
        project_id: ProjectId,
        /// The committed task, computed dates included.
        task: Task,
    },
    /// A task was deleted along with every dependency touching it.
    TaskDeleted {
        project_id: ProjectId,
        task_id: TaskId,
        /// Dependencies removed by the cascade.
        removed_dependencies: Vec<DependencyId>,
    },
    /// A dependency was created between two existing tasks.
    DependencyCreated {
        project_id: ProjectId,
        dependency: Dependency,
    },
    /// A dependency was removed; its endpoints remain.
    DependencyDeleted {
        project_id: ProjectId,
        dependency_id: DependencyId,
    },
    /// A whole project and its schedule were dropped.
    ProjectDeleted { project_id: ProjectId },
    /// The schedule for a project was recomputed and committed.
    ScheduleRecomputed {
        project_id: ProjectId,
        result: RecomputeResult,
    },
}

impl EngineEvent {
    /// Project the event belongs to.
    pub fn project_id(&self) -> ProjectId {
        match self {
            Self::TaskCreated { project_id, .. }
            | Self::TaskDeleted { project_id, .. }
            | Self::DependencyCreated { project_id, .. }
            | Self::DependencyDeleted { project_id, .. }
            | Self::ProjectDeleted { project_id }
            | Self::ScheduleRecomputed { project_id, .. } => *project_id,
        }
    }
}

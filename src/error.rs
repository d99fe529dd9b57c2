use thiserror::Error;

use crate::core::dependency::DependencyId;
use crate::core::task::{ProjectId, TaskId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Project not found: {0}")]
    UnknownProject(ProjectId),

    #[error("Task not found: {0}")]
    UnknownTask(TaskId),

    #[error("Dependency not found: {0}")]
    UnknownDependency(DependencyId),

    #[error("Task already exists: {0}")]
    DuplicateTask(TaskId),

    #[error("Task {0} cannot depend on itself")]
    SelfLink(TaskId),

    #[error("Dependency from {predecessor} to {successor} already exists")]
    DuplicateDependency {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("Dependency from {predecessor} to {successor} would create a cycle")]
    Cycle {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("Dependency graph contains a cycle at task {0}")]
    CycleDetected(TaskId),

    #[error("Invalid duration {days} days (milestones are 0 days, other tasks at least 1)")]
    InvalidDuration { days: u32, milestone: bool },

    #[error("Invalid progress {0}% (expected 0-100)")]
    InvalidProgress(u8),

    #[error("Project {project_id} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification {
        project_id: ProjectId,
        expected: u64,
        found: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

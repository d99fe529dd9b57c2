//! Persistence for project graphs.
//!
//! Projects are stored whole: one snapshot per project, carrying every
//! task and dependency plus a monotonically increasing version. Writers
//! pass the version they loaded; a mismatch at save time means someone
//! else committed first and the write is refused, so callers reload and
//! retry instead of clobbering each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::dependency::{Dependency, DependencyId};
use crate::core::task::{ProjectId, Task, TaskId};
use crate::error::Result;

pub mod memory;

pub use memory::MemoryStore;

/// Serialized form of one project's graph at a committed version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub project_id: ProjectId,
    /// Version the snapshot was committed at. 0 means never stored.
    pub version: u64,
    pub tasks: Vec<Task>,
    pub dependencies: Vec<Dependency>,
    pub updated_at: DateTime<Utc>,
}

/// Backend that owns committed project snapshots.
///
/// Implementations must make `save` atomic with respect to its version
/// check: the stored version is compared against `expected_version`
/// (0 for a project never stored), and on success the snapshot is
/// committed at `expected_version + 1`, which is returned. A mismatch
/// yields `ConcurrentModification` and leaves the stored snapshot
/// untouched.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch the committed snapshot for a project, if any.
    async fn load(&self, project_id: ProjectId) -> Result<Option<GraphSnapshot>>;

    /// Commit a snapshot, guarded by the version the writer loaded.
    async fn save(&self, snapshot: GraphSnapshot, expected_version: u64) -> Result<u64>;

    /// Drop a project and all bookkeeping for it. Removing a project
    /// that was never stored is not an error.
    async fn remove(&self, project_id: ProjectId) -> Result<()>;

    /// Reverse lookup: which project owns this task.
    async fn project_of_task(&self, task_id: TaskId) -> Result<Option<ProjectId>>;

    /// Reverse lookup: which project owns this dependency.
    async fn project_of_dependency(
        &self,
        dependency_id: DependencyId,
    ) -> Result<Option<ProjectId>>;
}

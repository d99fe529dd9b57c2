//! In-memory store for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::dependency::DependencyId;
use crate::core::task::{ProjectId, TaskId};
use crate::error::{Error, Result};

use super::{GraphSnapshot, ProjectStore};

/// Snapshot store backed by a process-local map.
///
/// The version check runs under the same write lock as the insert, so
/// concurrent writers observe the same first-committer-wins behavior a
/// database backend would give.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshots: HashMap<ProjectId, GraphSnapshot>,
    task_projects: HashMap<TaskId, ProjectId>,
    dependency_projects: HashMap<DependencyId, ProjectId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of projects currently stored.
    pub async fn project_count(&self) -> usize {
        self.inner.read().await.snapshots.len()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn load(&self, project_id: ProjectId) -> Result<Option<GraphSnapshot>> {
        Ok(self.inner.read().await.snapshots.get(&project_id).cloned())
    }

    async fn save(&self, mut snapshot: GraphSnapshot, expected_version: u64) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let project_id = snapshot.project_id;

        let found = inner
            .snapshots
            .get(&project_id)
            .map_or(0, |stored| stored.version);
        if found != expected_version {
            return Err(Error::ConcurrentModification {
                project_id,
                expected: expected_version,
                found,
            });
        }

        let next = expected_version + 1;
        snapshot.version = next;

        // Rebuild the reverse lookups from the new snapshot so entries
        // for deleted tasks and dependencies do not linger.
        inner.task_projects.retain(|_, owner| *owner != project_id);
        inner
            .dependency_projects
            .retain(|_, owner| *owner != project_id);
        for task in &snapshot.tasks {
            inner.task_projects.insert(task.id, project_id);
        }
        for dependency in &snapshot.dependencies {
            inner.dependency_projects.insert(dependency.id, project_id);
        }

        inner.snapshots.insert(project_id, snapshot);
        Ok(next)
    }

    async fn remove(&self, project_id: ProjectId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.snapshots.remove(&project_id);
        inner.task_projects.retain(|_, owner| *owner != project_id);
        inner
            .dependency_projects
            .retain(|_, owner| *owner != project_id);
        Ok(())
    }

    async fn project_of_task(&self, task_id: TaskId) -> Result<Option<ProjectId>> {
        Ok(self.inner.read().await.task_projects.get(&task_id).copied())
    }

    async fn project_of_dependency(
        &self,
        dependency_id: DependencyId,
    ) -> Result<Option<ProjectId>> {
        Ok(self
            .inner
            .read()
            .await
            .dependency_projects
            .get(&dependency_id)
            .copied())
    }
}

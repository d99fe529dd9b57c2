//! Per-project task graph: the arena of tasks plus their dependency edges.
//!
//! Nodes are tasks, edges are typed dependency links. The graph is the
//! single in-memory representation every other component works against:
//! the validator reads it, the solver traverses it, the orchestrator
//! mutates it and snapshots it for persistence.
//!
//! Semantic rules (uniqueness of links, cycle prevention, duration
//! bounds) are enforced by the validator before mutation; the graph
//! itself only guards structural integrity (known endpoints, unique
//! ids). The solver's topological sort still surfaces a cycle that
//! slipped past validation as a hard internal error.

use crate::core::dependency::{Dependency, DependencyId};
use crate::core::task::{ProjectId, Task, TaskId, TaskSchedule};
use crate::error::{Error, Result};
use crate::store::GraphSnapshot;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::HashMap;

/// The dependency graph of one project.
///
/// Uses petgraph's `StableDiGraph` so node and edge indices stay valid
/// across removals; tasks and links are addressed by their ids through
/// side indices.
pub struct TaskGraph {
    /// Project this graph belongs to.
    project_id: ProjectId,
    /// The underlying directed graph.
    graph: StableDiGraph<Task, Dependency>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
    /// Index mapping from DependencyId to EdgeIndex for removal by id.
    dep_index: HashMap<DependencyId, EdgeIndex>,
}

impl TaskGraph {
    /// Create a new empty graph for a project.
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            graph: StableDiGraph::default(),
            task_index: HashMap::new(),
            dep_index: HashMap::new(),
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Add a task to the graph.
    ///
    /// Hierarchy levels are refreshed afterwards. Parent existence is
    /// the validator's concern, not checked here.
    ///
    /// # Errors
    /// Returns `DuplicateTask` if a task with the same id is present.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if self.task_index.contains_key(&task.id) {
            return Err(Error::DuplicateTask(task.id));
        }

        let id = task.id;
        let index = self.graph.add_node(task);
        self.task_index.insert(id, index);
        self.recompute_levels();
        Ok(())
    }

    /// Remove a task, cascading removal of every link that touches it.
    ///
    /// Hierarchy children of the removed task are reparented to its own
    /// parent (or become roots) so the breakdown structure stays intact.
    ///
    /// Returns the removed task together with the removed links, in case
    /// the caller needs to report them.
    ///
    /// # Errors
    /// Returns `UnknownTask` if the task is not in the graph.
    pub fn remove_task(&mut self, id: &TaskId) -> Result<(Task, Vec<Dependency>)> {
        let index = *self.task_index.get(id).ok_or(Error::UnknownTask(*id))?;

        let mut removed_deps: Vec<Dependency> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| edge.weight().clone())
            .collect();
        removed_deps.extend(
            self.graph
                .edges_directed(index, Direction::Outgoing)
                .map(|edge| edge.weight().clone()),
        );
        for dep in &removed_deps {
            self.dep_index.remove(&dep.id);
        }

        let new_parent = self
            .graph
            .node_weight(index)
            .and_then(|task| task.parent_id);
        let child_ids: Vec<TaskId> = self
            .graph
            .node_weights()
            .filter(|task| task.parent_id == Some(*id))
            .map(|task| task.id)
            .collect();
        for child_id in child_ids {
            if let Some(child) = self.task_mut(&child_id) {
                child.set_parent(new_parent);
            }
        }

        self.task_index.remove(id);
        let task = self
            .graph
            .remove_node(index)
            .ok_or(Error::UnknownTask(*id))?;
        self.recompute_levels();
        Ok((task, removed_deps))
    }

    /// Add a dependency link between two tasks already in the graph.
    ///
    /// Uniqueness and acyclicity are checked by the validator before
    /// this is called.
    ///
    /// # Errors
    /// Returns `UnknownTask` if either endpoint is missing.
    pub fn add_dependency(&mut self, dependency: Dependency) -> Result<()> {
        let pred_index = *self
            .task_index
            .get(&dependency.predecessor_id)
            .ok_or(Error::UnknownTask(dependency.predecessor_id))?;
        let succ_index = *self
            .task_index
            .get(&dependency.successor_id)
            .ok_or(Error::UnknownTask(dependency.successor_id))?;

        let id = dependency.id;
        let edge = self.graph.add_edge(pred_index, succ_index, dependency);
        self.dep_index.insert(id, edge);
        Ok(())
    }

    /// Remove a dependency link by id, returning the removed record.
    ///
    /// # Errors
    /// Returns `UnknownDependency` if no link with this id exists.
    pub fn remove_dependency(&mut self, id: &DependencyId) -> Result<Dependency> {
        let edge = self
            .dep_index
            .remove(id)
            .ok_or(Error::UnknownDependency(*id))?;
        self.graph
            .remove_edge(edge)
            .ok_or(Error::UnknownDependency(*id))
    }

    /// Get a reference to a task by its ID.
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get a mutable reference to a task by its ID.
    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph.node_weight_mut(index)
        } else {
            None
        }
    }

    /// Check if the graph contains a task.
    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task_index.contains_key(id)
    }

    /// Get a reference to a dependency link by its ID.
    pub fn dependency(&self, id: &DependencyId) -> Option<&Dependency> {
        self.dep_index
            .get(id)
            .and_then(|&edge| self.graph.edge_weight(edge))
    }

    /// Check if a link already exists for the ordered pair
    /// (predecessor, successor), regardless of its kind.
    pub fn has_dependency_between(&self, predecessor: &TaskId, successor: &TaskId) -> bool {
        if let (Some(&pred), Some(&succ)) = (
            self.task_index.get(predecessor),
            self.task_index.get(successor),
        ) {
            self.graph.find_edge(pred, succ).is_some()
        } else {
            false
        }
    }

    /// All tasks, in stable node order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.node_weights()
    }

    /// All dependency links, in stable edge order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.graph.edge_weights()
    }

    /// Get the number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependency links in the graph.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Links pointing at the given task (its predecessors' edges).
    pub fn incoming(&self, id: &TaskId) -> Vec<&Dependency> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .edges_directed(index, Direction::Incoming)
                .map(|edge| edge.weight())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Links leaving the given task (its successors' edges).
    pub fn outgoing(&self, id: &TaskId) -> Vec<&Dependency> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .edges_directed(index, Direction::Outgoing)
                .map(|edge| edge.weight())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Hierarchy children of a task (not dependency successors).
    pub fn children_of(&self, id: &TaskId) -> Vec<TaskId> {
        self.graph
            .node_weights()
            .filter(|task| task.parent_id == Some(*id))
            .map(|task| task.id)
            .collect()
    }

    /// Whether a directed dependency path leads from `from` to `to`.
    ///
    /// Read-only DFS; used to answer "would an edge close a cycle"
    /// without touching the graph.
    pub fn path_exists(&self, from: &TaskId, to: &TaskId) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.task_index.get(from), self.task_index.get(to))
        {
            has_path_connecting(&self.graph, from_idx, to_idx, None)
        } else {
            false
        }
    }

    /// Task ids in topological order (every predecessor before its
    /// successors).
    ///
    /// # Errors
    /// Returns `CycleDetected` if the graph is not acyclic. Since every
    /// link is validated before insertion this indicates an internal
    /// defect or a corrupt snapshot, not a user mistake.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let task_id = self
                .graph
                .node_weight(cycle.node_id())
                .map(|task| task.id)
                .unwrap_or_default();
            Error::CycleDetected(task_id)
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index).map(|task| task.id))
            .collect())
    }

    /// Overwrite every task's computed block with freshly solved values.
    pub fn apply_schedule(&mut self, entries: &[(TaskId, TaskSchedule)]) {
        for (id, schedule) in entries {
            if let Some(&index) = self.task_index.get(id) {
                if let Some(task) = self.graph.node_weight_mut(index) {
                    task.schedule = schedule.clone();
                }
            }
        }
    }

    /// Rebuild a graph from a persisted snapshot.
    ///
    /// Tasks are inserted before links, so snapshot record order does
    /// not matter.
    ///
    /// # Errors
    /// Returns `DuplicateTask` or `UnknownTask` if the snapshot is
    /// internally inconsistent.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = Self::new(snapshot.project_id);
        for task in snapshot.tasks {
            if graph.task_index.contains_key(&task.id) {
                return Err(Error::DuplicateTask(task.id));
            }
            let id = task.id;
            let index = graph.graph.add_node(task);
            graph.task_index.insert(id, index);
        }
        for dependency in snapshot.dependencies {
            graph.add_dependency(dependency)?;
        }
        graph.recompute_levels();
        Ok(graph)
    }

    /// Capture the graph as a serializable snapshot at the given version.
    pub fn to_snapshot(&self, version: u64) -> GraphSnapshot {
        GraphSnapshot {
            project_id: self.project_id,
            version,
            tasks: self.tasks().cloned().collect(),
            dependencies: self.dependencies().cloned().collect(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Refresh every task's hierarchy level from its parent chain.
    ///
    /// A dangling or cyclic parent chain degrades to root level rather
    /// than looping; snapshots produced by this crate never contain one.
    fn recompute_levels(&mut self) {
        let parents: HashMap<TaskId, Option<TaskId>> = self
            .graph
            .node_weights()
            .map(|task| (task.id, task.parent_id))
            .collect();

        let cap = parents.len();
        let mut levels: HashMap<TaskId, u32> = HashMap::new();
        for id in parents.keys() {
            let mut level = 0u32;
            let mut cursor = *id;
            for _ in 0..cap {
                match parents.get(&cursor) {
                    Some(Some(parent)) if parents.contains_key(parent) => {
                        level += 1;
                        cursor = *parent;
                    }
                    _ => break,
                }
            }
            levels.insert(*id, level);
        }

        for task in self.graph.node_weights_mut() {
            if let Some(&level) = levels.get(&task.id) {
                task.level = level;
            }
        }
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("project", &self.project_id.short())
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}

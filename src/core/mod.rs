//! Core domain models for the scheduling engine.
//!
//! This module contains the fundamental data structures every other
//! component works with: tasks, dependency links, the per-project
//! graph, and the pre-mutation validators.

pub mod dependency;
pub mod graph;
pub mod task;
pub mod validate;

pub use dependency::{Dependency, DependencyId, DependencyKind};
pub use graph::TaskGraph;
pub use task::{Day, ProjectId, SchedulingStatus, Task, TaskId, TaskSchedule};

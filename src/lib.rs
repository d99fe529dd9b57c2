pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod solver;
pub mod store;

// Write path: validated edits, full recompute, optimistic commit
pub mod orchestration;

pub use crate::core::{
    Day, Dependency, DependencyId, DependencyKind, ProjectId, SchedulingStatus, Task, TaskGraph,
    TaskId, TaskSchedule,
};
pub use error::{Error, Result};
pub use orchestration::{EngineEvent, NewTask, RecomputeResult, ScheduleEngine, ScheduledTask};
pub use solver::{solve, Conflict, Schedule};
pub use store::{GraphSnapshot, MemoryStore, ProjectStore};

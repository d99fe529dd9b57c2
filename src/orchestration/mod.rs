//! Orchestration layer for schedule recalculation.
//!
//! This module owns the write path: the engine that turns individual
//! edits (create, delete, pin, resize) into validated, fully recomputed
//! and committed schedules, and the events it publishes so other
//! components can follow along.

mod engine;
mod events;

pub use engine::{NewTask, RecomputeResult, ScheduleEngine, ScheduledTask};
pub use events::EngineEvent;

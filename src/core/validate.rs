//! Pre-mutation validation of graph edits.
//!
//! Every check runs against a read-only view of the graph and rejects
//! before anything is mutated, so a failed edit leaves no partial state
//! behind. Checks run in a fixed order, most specific first: unknown
//! endpoints, then self-links, then duplicates, then cycles.

use crate::core::graph::TaskGraph;
use crate::core::task::TaskId;
use crate::error::{Error, Result};

/// Validate a prospective dependency link before it is inserted.
///
/// The cycle check asks whether a directed path already leads from the
/// successor back to the predecessor; if one does, the new edge would
/// close a cycle. This is a DFS over existing edges only, and the graph
/// is never touched.
pub fn check_new_dependency(
    graph: &TaskGraph,
    predecessor: &TaskId,
    successor: &TaskId,
) -> Result<()> {
    if !graph.contains_task(predecessor) {
        return Err(Error::UnknownTask(*predecessor));
    }
    if !graph.contains_task(successor) {
        return Err(Error::UnknownTask(*successor));
    }
    if predecessor == successor {
        return Err(Error::SelfLink(*predecessor));
    }
    if graph.has_dependency_between(predecessor, successor) {
        return Err(Error::DuplicateDependency {
            predecessor: *predecessor,
            successor: *successor,
        });
    }
    if graph.path_exists(successor, predecessor) {
        return Err(Error::Cycle {
            predecessor: *predecessor,
            successor: *successor,
        });
    }
    Ok(())
}

/// Validate a prospective task before it is inserted.
pub fn check_new_task(
    graph: &TaskGraph,
    parent_id: Option<&TaskId>,
    duration_days: u32,
    is_milestone: bool,
) -> Result<()> {
    if let Some(parent) = parent_id {
        if !graph.contains_task(parent) {
            return Err(Error::UnknownTask(*parent));
        }
    }
    check_duration(is_milestone, duration_days)
}

/// Milestones are exactly zero days; ordinary tasks at least one.
pub fn check_duration(is_milestone: bool, days: u32) -> Result<()> {
    let valid = if is_milestone { days == 0 } else { days >= 1 };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidDuration {
            days,
            milestone: is_milestone,
        })
    }
}

/// Progress is a percentage, 0 to 100 inclusive.
pub fn check_progress(percent: u8) -> Result<()> {
    if percent <= 100 {
        Ok(())
    } else {
        Err(Error::InvalidProgress(percent))
    }
}

//! Changeset machinery: grouping per-file CVS revisions into cross-file
//! changesets, the dependency graph over them, cycle detection and breaking,
//! and the topological scheduler that assigns output timestamps.

use thiserror::Error;

mod build;
pub use build::{Grouper, RevStub};

mod graph;
pub use graph::{split_at_time_gap, ChangesetGraph, GraphNode, TimeRange};

mod schedule;
pub use schedule::{schedule, Scheduled};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} changeset(s) remain unscheduled; the graph still contains a cycle")]
    CycleRemains(usize),
}

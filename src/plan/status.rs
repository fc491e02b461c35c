// src/plan/status.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a single node within one plan run.
///
/// `Planned` and `Skippable` are the seeded states. `Succeeded`, `Failed`,
/// `Canceled` and `Blocked` are terminal for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Waiting on at least one predecessor.
    Planned,
    /// Below the starting tier; treated as already satisfied.
    Skippable,
    /// Eligible to have its next step submitted.
    Runnable,
    /// A step's job is in flight.
    Running,
    Succeeded,
    Failed,
    Canceled,
    /// An upstream node failed; this node will not run in this plan.
    Blocked,
}

impl NodeStatus {
    /// Planned, Runnable and Running keep a plan in progress.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            NodeStatus::Planned | NodeStatus::Runnable | NodeStatus::Running
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Canceled | NodeStatus::Blocked
        )
    }

    /// Whether a node in this status lets its dependents start.
    pub fn satisfies_dependents(&self) -> bool {
        matches!(self, NodeStatus::Succeeded | NodeStatus::Skippable)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Planned => "PLANNED",
            NodeStatus::Skippable => "SKIPPABLE",
            NodeStatus::Runnable => "RUNNABLE",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Succeeded => "SUCCEEDED",
            NodeStatus::Failed => "FAILED",
            NodeStatus::Canceled => "CANCELED",
            NodeStatus::Blocked => "BLOCKED",
        };
        f.write_str(s)
    }
}

/// Overall status of a plan, derived from its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Nothing has been submitted yet.
    Planned,
    Running,
    /// Terminal, and every node succeeded or was skipped.
    Succeeded,
    /// Terminal, with at least one failed, canceled or blocked node.
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Succeeded | PlanStatus::Failed)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStatus::Planned => "PLANNED",
            PlanStatus::Running => "RUNNING",
            PlanStatus::Succeeded => "SUCCEEDED",
            PlanStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

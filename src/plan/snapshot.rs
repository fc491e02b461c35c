// src/plan/snapshot.rs

//! Timestamped JSON records of a plan, written after each round when
//! `save_state` is configured. They are for inspection only; nothing reads
//! them back during a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::plan::planner::Plan;
use crate::plan::status::{NodeStatus, PlanStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub status: NodeStatus,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// Scheduling round that produced this record, starting at 1.
    pub round: u64,
    pub taken_at: DateTime<Utc>,
    pub plan_status: PlanStatus,
    /// One record per node, in priority order.
    pub nodes: Vec<NodeRecord>,
}

impl PlanSnapshot {
    pub fn from_plan(plan: &Plan, round: u64) -> Self {
        Self {
            round,
            taken_at: Utc::now(),
            plan_status: plan.status(),
            nodes: plan
                .by_priority()
                .into_iter()
                .map(|n| NodeRecord {
                    name: n.name.clone(),
                    status: n.status,
                    priority: n.priority,
                })
                .collect(),
        }
    }

    /// `plan_<round>_<timestamp>.json`. The zero-padded round keeps names
    /// unique within a run and sorts them in order.
    pub fn file_name(&self) -> String {
        format!(
            "plan_{:05}_{}.json",
            self.round,
            self.taken_at.format("%Y-%m-%dT%H-%M-%S%.3f")
        )
    }
}

/// Write `snapshot` into `dir` (created if needed) and return the file path.
pub fn write_snapshot(dir: &Path, snapshot: &PlanSnapshot) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(snapshot.file_name());
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&path, json)?;
    debug!(path = ?path, "wrote plan snapshot");
    Ok(path)
}

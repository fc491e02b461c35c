// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::time::Duration;

use thiserror::Error;

use crate::catalog::Step;
use crate::plan::NodeStatus;
use crate::types::ProjectType;

#[derive(Error, Debug)]
pub enum TierflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The plan asked for a step the step catalog has no backend action for.
    #[error("no backend action mapped for step '{step}' of {project_type} projects")]
    MissingAction {
        project_type: ProjectType,
        step: Step,
    },

    #[error("monitoring nodes [{}] timed out after {timeout:?} without a status change", .nodes.join(", "))]
    MonitorTimeout {
        nodes: Vec<String>,
        timeout: Duration,
    },

    #[error("plan cannot make progress; nodes still waiting: [{}]", .0.join(", "))]
    PlanStalled(Vec<String>),

    #[error("node '{node}' cannot submit a step while {status}")]
    NodeNotRunnable { node: String, status: NodeStatus },

    #[error("node '{0}' has no remaining steps to submit")]
    NothingToSubmit(String),

    #[error("Project not found: {0}")]
    UnknownProject(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TierflowError>;

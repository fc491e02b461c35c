// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Family of a project; decides which steps it runs and which backend
/// actions those steps map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    SchemaMapping,
    /// Also known as "dedup".
    #[serde(alias = "dedup")]
    Mastering,
    Categorization,
    GoldenRecords,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::SchemaMapping => "schema_mapping",
            ProjectType::Mastering => "mastering",
            ProjectType::Categorization => "categorization",
            ProjectType::GoldenRecords => "golden_records",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "schema_mapping" | "schema_mapping_recommendations" => Ok(ProjectType::SchemaMapping),
            "mastering" | "dedup" => Ok(ProjectType::Mastering),
            "categorization" => Ok(ProjectType::Categorization),
            "golden_records" => Ok(ProjectType::GoldenRecords),
            other => Err(format!(
                "invalid project type: {other} (expected \"schema_mapping\", \"mastering\", \"categorization\" or \"golden_records\")"
            )),
        }
    }
}

/// A project as the scheduler sees it.
///
/// The scheduler never talks to the project directly; it hands the project to
/// a [`Backend`](crate::backend::Backend) together with the action to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub project_type: ProjectType,
    /// Glob patterns (relative to the backend root) whose contents decide
    /// whether a step's output is already current.
    pub inputs: Vec<String>,
}

impl Project {
    pub fn new(name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            name: name.into(),
            project_type,
            inputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }
}

/// Where input fingerprints are kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStorage {
    /// Store fingerprints in `.tierflow/fingerprints`.
    #[default]
    File,
    /// Store fingerprints in memory only (lost on exit).
    Memory,
}

// src/catalog.rs

//! Step catalog: which steps each project family runs, and which backend
//! action each step invokes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ProjectType;

/// One named unit of work in a project's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    UpdateUnifiedDataset,
    GeneratePairs,
    ApplyFeedback,
    UpdateHighImpactPairs,
    UpdateClusters,
    PublishClusters,
    UpdateResultsOnly,
    ProfileGoldenRecords,
    UpdateGoldenRecords,
    PublishGoldenRecords,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::UpdateUnifiedDataset => "update_unified_dataset",
            Step::GeneratePairs => "generate_pairs",
            Step::ApplyFeedback => "apply_feedback",
            Step::UpdateHighImpactPairs => "update_high_impact_pairs",
            Step::UpdateClusters => "update_clusters",
            Step::PublishClusters => "publish_clusters",
            Step::UpdateResultsOnly => "update_results_only",
            Step::ProfileGoldenRecords => "profile_golden_records",
            Step::UpdateGoldenRecords => "update_golden_records",
            Step::PublishGoldenRecords => "publish_golden_records",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a backend job, e.g. `mastering.update_pair_predictions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub project_type: ProjectType,
    pub job: &'static str,
}

impl Action {
    /// Fully qualified name used as the key in the `[actions]` config table.
    pub fn name(&self) -> String {
        format!("{}.{}", self.project_type, self.job)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_type, self.job)
    }
}

const WORKFLOW: &[(ProjectType, Step, &str)] = &[
    (ProjectType::SchemaMapping, Step::UpdateUnifiedDataset, "update_unified_dataset"),
    (ProjectType::Mastering, Step::UpdateUnifiedDataset, "update_unified_dataset"),
    (ProjectType::Mastering, Step::GeneratePairs, "generate_pairs"),
    (ProjectType::Mastering, Step::ApplyFeedback, "apply_feedback"),
    (ProjectType::Mastering, Step::UpdateHighImpactPairs, "update_pair_predictions"),
    (ProjectType::Mastering, Step::UpdateClusters, "update_clusters"),
    (ProjectType::Mastering, Step::PublishClusters, "publish_clusters"),
    (ProjectType::Categorization, Step::UpdateUnifiedDataset, "update_unified_dataset"),
    (ProjectType::Categorization, Step::ApplyFeedback, "apply_feedback"),
    (ProjectType::Categorization, Step::UpdateResultsOnly, "update_results_only"),
    (ProjectType::GoldenRecords, Step::ProfileGoldenRecords, "update_input_dataset_profiling_information"),
    (ProjectType::GoldenRecords, Step::UpdateGoldenRecords, "update_golden_records"),
    (ProjectType::GoldenRecords, Step::PublishGoldenRecords, "publish_golden_records"),
];

/// Ordered step list for a project family.
///
/// `train` adds the feedback step to mastering and categorization pipelines;
/// the other families ignore it.
pub fn steps_for(project_type: ProjectType, train: bool) -> Vec<Step> {
    match project_type {
        ProjectType::SchemaMapping => vec![Step::UpdateUnifiedDataset],
        ProjectType::Mastering => {
            let mut steps = vec![Step::UpdateUnifiedDataset, Step::GeneratePairs];
            if train {
                steps.push(Step::ApplyFeedback);
            }
            steps.extend([
                Step::UpdateHighImpactPairs,
                Step::UpdateClusters,
                Step::PublishClusters,
            ]);
            steps
        }
        ProjectType::Categorization => {
            let mut steps = vec![Step::UpdateUnifiedDataset];
            if train {
                steps.push(Step::ApplyFeedback);
            }
            steps.push(Step::UpdateResultsOnly);
            steps
        }
        ProjectType::GoldenRecords => vec![
            Step::ProfileGoldenRecords,
            Step::UpdateGoldenRecords,
            Step::PublishGoldenRecords,
        ],
    }
}

/// Backend action for `(project_type, step)`, or `None` when the pair is not
/// part of the catalog.
pub fn action_for(project_type: ProjectType, step: Step) -> Option<Action> {
    WORKFLOW
        .iter()
        .find(|(pt, s, _)| *pt == project_type && *s == step)
        .map(|(pt, _, job)| Action {
            project_type: *pt,
            job: *job,
        })
}

/// Every action the catalog knows about, in table order.
pub fn all_actions() -> impl Iterator<Item = Action> {
    WORKFLOW.iter().map(|(pt, _, job)| Action {
        project_type: *pt,
        job: *job,
    })
}

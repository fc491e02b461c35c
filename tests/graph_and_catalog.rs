// tests/graph_and_catalog.rs

use tierflow::catalog::{self, Step};
use tierflow::dag::DagGraph;
use tierflow::errors::TierflowError;
use tierflow::types::ProjectType;
use tierflow_test_utils::builders::{ConfigFileBuilder, ProjectConfigBuilder};

const ALL_TYPES: [ProjectType; 4] = [
    ProjectType::SchemaMapping,
    ProjectType::Mastering,
    ProjectType::Categorization,
    ProjectType::GoldenRecords,
];

fn diamond() -> DagGraph {
    DagGraph::from_dependencies([
        ("A", vec![]),
        ("B", vec!["A"]),
        ("C", vec!["A"]),
        ("D", vec!["B", "C"]),
    ])
    .unwrap()
}

#[test]
fn step_counts_per_project_type() {
    let count = |t, train| catalog::steps_for(t, train).len();

    assert_eq!(count(ProjectType::SchemaMapping, false), 1);
    assert_eq!(count(ProjectType::SchemaMapping, true), 1);
    assert_eq!(count(ProjectType::Mastering, false), 5);
    assert_eq!(count(ProjectType::Mastering, true), 6);
    assert_eq!(count(ProjectType::Categorization, false), 2);
    assert_eq!(count(ProjectType::Categorization, true), 3);
    assert_eq!(count(ProjectType::GoldenRecords, false), 3);
    assert_eq!(count(ProjectType::GoldenRecords, true), 3);
}

#[test]
fn training_inserts_feedback_before_predictions() {
    assert_eq!(
        catalog::steps_for(ProjectType::Mastering, true),
        vec![
            Step::UpdateUnifiedDataset,
            Step::GeneratePairs,
            Step::ApplyFeedback,
            Step::UpdateHighImpactPairs,
            Step::UpdateClusters,
            Step::PublishClusters,
        ]
    );
    assert_eq!(
        catalog::steps_for(ProjectType::Categorization, true),
        vec![
            Step::UpdateUnifiedDataset,
            Step::ApplyFeedback,
            Step::UpdateResultsOnly,
        ]
    );
}

#[test]
fn every_planned_step_has_an_action() {
    for project_type in ALL_TYPES {
        for train in [false, true] {
            for step in catalog::steps_for(project_type, train) {
                let action = catalog::action_for(project_type, step);
                assert!(
                    action.is_some(),
                    "{project_type} step {step} has no action"
                );
                assert_eq!(action.unwrap().project_type, project_type);
            }
        }
    }
}

#[test]
fn action_names_are_type_qualified() {
    let action = catalog::action_for(ProjectType::Mastering, Step::UpdateHighImpactPairs).unwrap();
    assert_eq!(action.name(), "mastering.update_pair_predictions");
    assert_eq!(action.to_string(), action.name());

    assert!(catalog::action_for(ProjectType::SchemaMapping, Step::GeneratePairs).is_none());
    assert_eq!(catalog::all_actions().count(), 13);
}

#[test]
fn project_type_accepts_dedup_alias() {
    assert_eq!("dedup".parse::<ProjectType>(), Ok(ProjectType::Mastering));
    assert_eq!(" Mastering ".parse::<ProjectType>(), Ok(ProjectType::Mastering));
    assert!("unknown".parse::<ProjectType>().is_err());
}

#[test]
fn tiers_follow_longest_dependency_path() {
    let graph = diamond();

    let tiers: Vec<(usize, Vec<String>)> = graph
        .tiers()
        .iter()
        .map(|(t, names)| (*t, names.clone()))
        .collect();
    assert_eq!(
        tiers,
        vec![
            (0, vec!["A".to_string()]),
            (1, vec!["B".to_string(), "C".to_string()]),
            (2, vec!["D".to_string()]),
        ]
    );

    let skewed = DagGraph::from_dependencies([
        ("A", vec![]),
        ("B", vec!["A"]),
        ("C", vec!["A", "B"]),
    ])
    .unwrap();
    assert_eq!(skewed.tier_of("C"), Some(2));
}

#[test]
fn neighbours_and_downstream() {
    let graph = diamond();

    assert_eq!(graph.successors("A"), vec!["B", "C"]);
    assert_eq!(graph.predecessors("D"), vec!["B", "C"]);
    assert_eq!(graph.downstream("A"), vec!["B", "C", "D"]);
    assert_eq!(graph.downstream("B"), vec!["D"]);
    assert!(graph.downstream("D").is_empty());
    assert!(graph.downstream("missing").is_empty());
    assert_eq!(graph.len(), 4);
    assert!(graph.contains("C"));
}

#[test]
fn rejects_invalid_graphs() {
    let dup = DagGraph::from_dependencies([("A", Vec::<&str>::new()), ("A", Vec::new())]);
    assert!(matches!(dup, Err(TierflowError::ConfigError(msg)) if msg.contains("more than once")));

    let unknown = DagGraph::from_dependencies([("A", vec!["ghost"])]);
    assert!(matches!(unknown, Err(TierflowError::ConfigError(msg)) if msg.contains("unknown dependency")));

    let own = DagGraph::from_dependencies([("A", vec!["A"])]);
    assert!(matches!(own, Err(TierflowError::ConfigError(msg)) if msg.contains("itself")));

    let cycle = DagGraph::from_dependencies([("A", vec!["B"]), ("B", vec!["A"])]);
    assert!(matches!(cycle, Err(TierflowError::DagCycle(msg)) if msg.contains("cycle detected")));
}

#[test]
fn graph_from_config_uses_name_order_within_a_tier() {
    let cfg = ConfigFileBuilder::new()
        .with_project("zeta", ProjectConfigBuilder::new(ProjectType::SchemaMapping).build())
        .with_project("alpha", ProjectConfigBuilder::new(ProjectType::SchemaMapping).build())
        .with_project(
            "omega",
            ProjectConfigBuilder::new(ProjectType::Mastering)
                .after("alpha")
                .after("zeta")
                .build(),
        )
        .build();

    let graph = DagGraph::from_config(&cfg).unwrap();

    assert_eq!(graph.tiers()[&0usize], vec!["alpha".to_string(), "zeta".to_string()]);
    assert_eq!(graph.tiers()[&1usize], vec!["omega".to_string()]);
    assert_eq!(graph.predecessors("omega"), vec!["alpha", "zeta"]);
}

// tests/plan_propagation.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tierflow::catalog;
use tierflow::dag::DagGraph;
use tierflow::errors::TierflowError;
use tierflow::plan::{NodeStatus, Plan, PlanNode, PlanStatus};
use tierflow::types::{Project, ProjectType};
use tierflow_test_utils::builders::{diamond_plan, plan_from_edges};
use tierflow_test_utils::init_tracing;

fn with_status(plan: &Plan, name: &str, status: NodeStatus) -> PlanNode {
    let mut node = plan.node(name).unwrap().clone();
    node.status = status;
    node
}

fn status_of(plan: &Plan, name: &str) -> NodeStatus {
    plan.node(name).unwrap().status
}

fn chain() -> Plan {
    plan_from_edges(
        &[("A", &[]), ("B", &["A"]), ("C", &["B"])],
        ProjectType::SchemaMapping,
        0,
        false,
    )
}

#[test]
fn new_plan_seeds_first_tier_runnable() {
    init_tracing();
    let plan = diamond_plan();

    assert_eq!(status_of(&plan, "A"), NodeStatus::Runnable);
    assert_eq!(status_of(&plan, "B"), NodeStatus::Planned);
    assert_eq!(status_of(&plan, "C"), NodeStatus::Planned);
    assert_eq!(status_of(&plan, "D"), NodeStatus::Planned);
    assert_eq!(plan.status(), PlanStatus::Planned);
    assert!(!plan.is_terminal());
}

#[test]
fn priorities_follow_tier_then_declaration_order() {
    init_tracing();
    let plan = plan_from_edges(
        &[("root", &[]), ("zeta", &["root"]), ("alpha", &["root"]), ("leaf", &["zeta"])],
        ProjectType::SchemaMapping,
        0,
        false,
    );

    let order: Vec<(&str, u32)> = plan
        .by_priority()
        .into_iter()
        .map(|n| (n.name.as_str(), n.priority))
        .collect();
    assert_eq!(
        order,
        vec![("root", 0), ("zeta", 1), ("alpha", 2), ("leaf", 3)]
    );
}

#[test]
fn starting_tier_marks_earlier_tiers_skippable() {
    init_tracing();
    let graph = diamond_plan().graph().clone();
    let projects: BTreeMap<String, Project> = graph
        .projects()
        .map(|name| (name.to_string(), Project::new(name, ProjectType::SchemaMapping)))
        .collect();

    let tier1 = Plan::from_graph(Arc::new(graph.clone()), &projects, 1, false).unwrap();
    assert_eq!(status_of(&tier1, "A"), NodeStatus::Skippable);
    assert_eq!(status_of(&tier1, "B"), NodeStatus::Runnable);
    assert_eq!(status_of(&tier1, "C"), NodeStatus::Runnable);
    assert_eq!(status_of(&tier1, "D"), NodeStatus::Planned);

    let tier2 = Plan::from_graph(Arc::new(graph), &projects, 2, false).unwrap();
    assert_eq!(tier2.names_with_status(NodeStatus::Skippable), vec!["A", "B", "C"]);
    assert_eq!(tier2.names_with_status(NodeStatus::Runnable), vec!["D"]);
}

#[test]
fn success_unlocks_successors_and_leaves_input_plan_alone() {
    init_tracing();
    let plan = diamond_plan();

    let next = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Succeeded));

    assert_eq!(status_of(&next, "A"), NodeStatus::Succeeded);
    assert_eq!(status_of(&next, "B"), NodeStatus::Runnable);
    assert_eq!(status_of(&next, "C"), NodeStatus::Runnable);
    assert_eq!(status_of(&next, "D"), NodeStatus::Planned);
    assert_eq!(next.status(), PlanStatus::Running);

    assert_eq!(status_of(&plan, "A"), NodeStatus::Runnable);
    assert_eq!(status_of(&plan, "B"), NodeStatus::Planned);
}

#[test]
fn node_with_two_predecessors_waits_for_both() {
    init_tracing();
    let plan = diamond_plan();
    let plan = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Succeeded));

    let plan = plan.apply_node_update(&with_status(&plan, "B", NodeStatus::Succeeded));
    assert_eq!(status_of(&plan, "D"), NodeStatus::Planned);

    let plan = plan.apply_node_update(&with_status(&plan, "C", NodeStatus::Succeeded));
    assert_eq!(status_of(&plan, "D"), NodeStatus::Runnable);
}

#[test]
fn failure_blocks_node_even_if_other_predecessor_succeeds_later() {
    init_tracing();
    let plan = diamond_plan();
    let plan = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Succeeded));

    let plan = plan.apply_node_update(&with_status(&plan, "B", NodeStatus::Failed));
    assert_eq!(status_of(&plan, "D"), NodeStatus::Blocked);
    assert_eq!(status_of(&plan, "C"), NodeStatus::Runnable);

    let plan = plan.apply_node_update(&with_status(&plan, "C", NodeStatus::Succeeded));
    assert_eq!(status_of(&plan, "D"), NodeStatus::Blocked);

    assert!(plan.is_terminal());
    assert_eq!(plan.status(), PlanStatus::Failed);
}

#[test]
fn failure_blocks_every_transitive_dependent() {
    init_tracing();
    let plan = chain();

    let plan = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Failed));

    assert_eq!(status_of(&plan, "A"), NodeStatus::Failed);
    assert_eq!(status_of(&plan, "B"), NodeStatus::Blocked);
    assert_eq!(status_of(&plan, "C"), NodeStatus::Blocked);
    assert!(plan.is_terminal());
}

#[test]
fn running_update_changes_only_the_node() {
    init_tracing();
    let plan = chain();

    let next = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Running));

    assert_eq!(status_of(&next, "A"), NodeStatus::Running);
    assert_eq!(status_of(&next, "B"), NodeStatus::Planned);
    assert_eq!(status_of(&next, "C"), NodeStatus::Planned);
}

#[test]
fn update_replaces_the_whole_node() {
    init_tracing();
    let plan = chain();
    let mut updated = with_status(&plan, "A", NodeStatus::Runnable);
    updated.remaining.clear();
    updated.current_step = updated.steps.first().copied();

    let next = plan.apply_node_update(&updated);

    assert_eq!(next.node("A"), Some(&updated));
}

#[test]
fn update_for_unknown_node_is_ignored() {
    init_tracing();
    let plan = chain();
    let stranger = PlanNode::new(
        Project::new("stranger", ProjectType::SchemaMapping),
        99,
        Vec::new(),
        NodeStatus::Failed,
    );

    let next = plan.apply_node_update(&stranger);

    assert_eq!(next.len(), 3);
    assert!(next.node("stranger").is_none());
    assert_eq!(status_of(&next, "B"), NodeStatus::Planned);
}

#[test]
fn canceled_predecessor_leaves_plan_stalled() {
    init_tracing();
    let plan = chain();

    let plan = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Canceled));

    assert!(!plan.is_terminal());
    assert_eq!(plan.stalled_nodes(), Some(vec!["B".to_string(), "C".to_string()]));
}

#[test]
fn progressing_plan_is_not_stalled() {
    init_tracing();
    let plan = chain();
    assert_eq!(plan.stalled_nodes(), None);

    let done = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Failed));
    assert_eq!(done.stalled_nodes(), None);
}

#[test]
fn reseed_skips_finished_work_and_restarts_the_rest() {
    init_tracing();
    let plan = chain();
    let plan = plan.apply_node_update(&with_status(&plan, "A", NodeStatus::Succeeded));
    let mut failed = with_status(&plan, "B", NodeStatus::Failed);
    failed.remaining.clear();
    let plan = plan.apply_node_update(&failed);
    assert_eq!(status_of(&plan, "C"), NodeStatus::Blocked);

    let retry = plan.reseed_blocked();

    assert_eq!(status_of(&retry, "A"), NodeStatus::Skippable);
    assert_eq!(status_of(&retry, "B"), NodeStatus::Runnable);
    assert_eq!(status_of(&retry, "C"), NodeStatus::Planned);
    let b = retry.node("B").unwrap();
    assert_eq!(b.remaining.len(), b.steps.len());
    assert!(b.jobs.is_empty());
    assert_eq!(b.priority, plan.node("B").unwrap().priority);
}

#[test]
fn from_nodes_rejects_duplicate_priorities() {
    init_tracing();
    let graph = Arc::new(DagGraph::from_dependencies([("A", vec![]), ("B", vec!["A"])]).unwrap());
    let steps = catalog::steps_for(ProjectType::SchemaMapping, false);
    let nodes = vec![
        PlanNode::new(Project::new("A", ProjectType::SchemaMapping), 1, steps.clone(), NodeStatus::Planned),
        PlanNode::new(Project::new("B", ProjectType::SchemaMapping), 1, steps, NodeStatus::Planned),
    ];

    let result = Plan::from_nodes(graph, nodes, 0);
    assert!(matches!(result, Err(TierflowError::ConfigError(msg)) if msg.contains("priority 1")));
}

#[test]
fn from_nodes_requires_a_node_per_project() {
    init_tracing();
    let graph = Arc::new(DagGraph::from_dependencies([("A", vec![]), ("B", vec!["A"])]).unwrap());
    let steps = catalog::steps_for(ProjectType::SchemaMapping, false);

    let missing = vec![PlanNode::new(
        Project::new("A", ProjectType::SchemaMapping),
        0,
        steps.clone(),
        NodeStatus::Planned,
    )];
    let result = Plan::from_nodes(Arc::clone(&graph), missing, 0);
    assert!(matches!(result, Err(TierflowError::ConfigError(msg)) if msg.contains("'B'")));

    let unknown = vec![PlanNode::new(
        Project::new("Z", ProjectType::SchemaMapping),
        0,
        steps,
        NodeStatus::Planned,
    )];
    let result = Plan::from_nodes(graph, unknown, 0);
    assert!(matches!(result, Err(TierflowError::UnknownProject(name)) if name == "Z"));
}

#[test]
fn from_nodes_keeps_custom_steps_and_unlocks_roots() {
    init_tracing();
    let graph = Arc::new(DagGraph::from_dependencies([("A", vec![]), ("B", vec!["A"])]).unwrap());
    let nodes = vec![
        PlanNode::new(
            Project::new("A", ProjectType::Mastering),
            0,
            vec![catalog::Step::GeneratePairs],
            NodeStatus::Planned,
        ),
        PlanNode::new(
            Project::new("B", ProjectType::SchemaMapping),
            1,
            catalog::steps_for(ProjectType::SchemaMapping, false),
            NodeStatus::Planned,
        ),
    ];

    let plan = Plan::from_nodes(graph, nodes, 0).unwrap();

    assert_eq!(status_of(&plan, "A"), NodeStatus::Runnable);
    assert_eq!(plan.node("A").unwrap().steps, vec![catalog::Step::GeneratePairs]);
    assert_eq!(status_of(&plan, "B"), NodeStatus::Planned);
}

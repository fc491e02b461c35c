// tests/monitor.rs

use std::time::Duration;

use tierflow::catalog;
use tierflow::errors::TierflowError;
use tierflow::plan::{MonitorOptions, NodeStatus, PlanNode, monitor};
use tierflow::types::{Project, ProjectType};
use tierflow_test_utils::fake_backend::{Behaviour, FakeBackend, Outcome};
use tierflow_test_utils::init_tracing;

async fn running(name: &str, backend: &FakeBackend) -> PlanNode {
    PlanNode::new(
        Project::new(name, ProjectType::SchemaMapping),
        0,
        catalog::steps_for(ProjectType::SchemaMapping, false),
        NodeStatus::Runnable,
    )
    .submit_next_step(backend)
    .await
    .unwrap()
}

fn options() -> MonitorOptions {
    MonitorOptions::new(Duration::from_secs(1), Duration::from_secs(10))
}

#[tokio::test(start_paused = true)]
async fn empty_batch_returns_immediately() {
    init_tracing();
    let backend = FakeBackend::new();

    let result = monitor(Vec::new(), &backend, &options()).await.unwrap();

    assert!(result.is_empty());
}

#[tokio::test(start_paused = true)]
async fn returns_whole_batch_once_any_node_changes() {
    init_tracing();
    let backend = FakeBackend::new()
        .with_project("fast", Behaviour::new(Outcome::Succeed, 2))
        .with_project("slow", Behaviour::new(Outcome::Hang, 0));

    let batch = vec![running("slow", &backend).await, running("fast", &backend).await];
    let result = monitor(batch, &backend, &options()).await.unwrap();

    let names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["slow", "fast"]);
    assert_eq!(result[0].status, NodeStatus::Running);
    assert_eq!(result[1].status, NodeStatus::Succeeded);

    // Every node is polled each sweep, and the monitor stops at the sweep
    // that saw the change.
    assert_eq!(backend.poll_count("fast"), 2);
    assert_eq!(backend.poll_count("slow"), 2);
}

#[tokio::test(start_paused = true)]
async fn a_single_failure_releases_the_batch() {
    init_tracing();
    let backend = FakeBackend::new()
        .with_project("broken", Behaviour::new(Outcome::Fail, 1))
        .with_project("slow", Behaviour::new(Outcome::Hang, 0));

    let batch = vec![running("slow", &backend).await, running("broken", &backend).await];
    let result = monitor(batch, &backend, &options()).await.unwrap();

    assert_eq!(result[1].status, NodeStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn times_out_when_nothing_changes() {
    init_tracing();
    let backend = FakeBackend::new().with_default(Behaviour::new(Outcome::Hang, 0));

    let batch = vec![running("a", &backend).await, running("b", &backend).await];
    let started = tokio::time::Instant::now();
    let result = monitor(batch, &backend, &options()).await;

    match result {
        Err(TierflowError::MonitorTimeout { nodes, timeout }) => {
            assert_eq!(nodes, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(timeout, Duration::from_secs(10));
        }
        other => panic!("expected MonitorTimeout, got {:?}", other),
    }
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(backend.poll_count("a"), 10);
}

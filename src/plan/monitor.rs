// src/plan/monitor.rs

//! Batch monitor: wait until any node in a batch changes status.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::errors::{Result, TierflowError};
use crate::plan::node::PlanNode;
use crate::plan::status::NodeStatus;

/// How often to poll and how long to wait for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl MonitorOptions {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for MonitorOptions {
    /// 30 second polls, two day timeout.
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(2 * 24 * 3600),
        }
    }
}

/// Block until at least one node's status differs from its status on entry,
/// then return every node freshly polled, in input order.
///
/// The whole batch is compared at once so a single fast-finishing or failing
/// node releases the scheduler immediately. An empty batch returns
/// immediately. Reaching `timeout` without any change is an error.
pub async fn monitor<B>(
    nodes: Vec<PlanNode>,
    backend: &B,
    options: &MonitorOptions,
) -> Result<Vec<PlanNode>>
where
    B: Backend + ?Sized,
{
    if nodes.is_empty() {
        warn!("monitor called with an empty batch; something upstream is probably wrong");
        return Ok(Vec::new());
    }

    let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
    let initial: Vec<NodeStatus> = nodes.iter().map(|n| n.status).collect();

    info!(nodes = ?names, timeout = ?options.timeout, "monitoring nodes");

    let started = Instant::now();
    let mut current = nodes;
    let mut polls: u64 = 0;

    while started.elapsed() < options.timeout {
        sleep(options.poll_interval).await;
        polls += 1;

        let mut polled = Vec::with_capacity(current.len());
        for node in &current {
            polled.push(node.poll(backend).await?);
        }

        let changed = polled
            .iter()
            .zip(initial.iter())
            .any(|(node, before)| node.status != *before);
        current = polled;

        if changed {
            debug!(polls, elapsed = ?started.elapsed(), "status change observed");
            return Ok(current);
        }
    }

    error!(
        nodes = ?names,
        timeout = ?options.timeout,
        "monitoring timed out with no status change"
    );
    Err(TierflowError::MonitorTimeout {
        nodes: names,
        timeout: options.timeout,
    })
}

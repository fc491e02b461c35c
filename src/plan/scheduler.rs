// src/plan/scheduler.rs

//! Priority- and concurrency-bounded execution loop.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::errors::{Result, TierflowError};
use crate::plan::monitor::{MonitorOptions, monitor};
use crate::plan::node::PlanNode;
use crate::plan::planner::Plan;
use crate::plan::snapshot::{PlanSnapshot, write_snapshot};
use crate::plan::status::NodeStatus;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Maximum number of Running nodes at any time.
    pub concurrency_level: usize,
    pub monitor: MonitorOptions,
    /// Directory for per-round snapshots, if any.
    pub save_state: Option<PathBuf>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency_level: 2,
            monitor: MonitorOptions::default(),
            save_state: None,
        }
    }
}

/// Structured result of a single scheduling round.
///
/// Tests drive the loop by hand with [`Scheduler::step`] and assert on what
/// each round did.
#[derive(Debug, Clone)]
pub struct RoundStep {
    /// The plan after this round.
    pub plan: Plan,
    /// Nodes whose next step was submitted this round, in priority order.
    pub submitted: Vec<String>,
    /// Submitted nodes the backend reported as no-ops.
    pub noops: Vec<String>,
    /// Nodes whose status differs from the start of the round.
    pub changed: Vec<String>,
}

/// Drives a [`Plan`] to completion against a [`Backend`].
pub struct Scheduler<B: Backend> {
    backend: B,
    options: SchedulerOptions,
}

impl<B: Backend> Scheduler<B> {
    pub fn new(backend: B, options: SchedulerOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// With no slots a round submits nothing and the loop never advances.
    fn check_concurrency(&self) -> Result<()> {
        if self.options.concurrency_level == 0 {
            return Err(TierflowError::ConfigError(
                "concurrency_level must be >= 1 (got 0)".to_string(),
            ));
        }
        Ok(())
    }

    /// Run rounds until the plan is terminal.
    ///
    /// A failing node does not stop the loop; only a monitor timeout, a
    /// configuration error or a plan that can no longer progress does.
    pub async fn execute(&self, plan: Plan) -> Result<Plan> {
        self.check_concurrency()?;
        let mut plan = plan;
        let mut round: u64 = 0;

        loop {
            if plan.is_terminal() {
                info!(rounds = round, status = %plan.status(), "plan is terminal");
                return Ok(plan);
            }

            if let Some(stuck) = plan.stalled_nodes() {
                warn!(nodes = ?stuck, "no node can run; giving up");
                return Err(TierflowError::PlanStalled(stuck));
            }

            round += 1;
            debug!(round, "starting scheduling round");

            let step = self.step(plan).await?;
            plan = step.plan;

            info!(
                round,
                submitted = ?step.submitted,
                changed = ?step.changed,
                status = %plan.status(),
                "round complete"
            );

            if let Some(dir) = &self.options.save_state {
                write_snapshot(dir, &PlanSnapshot::from_plan(&plan, round))?;
            }
        }
    }

    /// Perform one round: submit what fits, wait for a change, propagate.
    pub async fn step(&self, plan: Plan) -> Result<RoundStep> {
        self.check_concurrency()?;
        if plan.is_terminal() {
            return Ok(RoundStep {
                plan,
                submitted: Vec::new(),
                noops: Vec::new(),
                changed: Vec::new(),
            });
        }

        let ordered = plan.by_priority();
        let running: Vec<PlanNode> = ordered
            .iter()
            .filter(|n| n.status == NodeStatus::Running)
            .map(|n| (*n).clone())
            .collect();

        let slots = self
            .options
            .concurrency_level
            .saturating_sub(running.len());
        let to_submit: Vec<PlanNode> = ordered
            .iter()
            .filter(|n| n.status == NodeStatus::Runnable)
            .take(slots)
            .map(|n| (*n).clone())
            .collect();

        info!(
            running = ?running.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            slots,
            submitting = ?to_submit.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            "scheduling round"
        );

        let mut submitted_nodes = Vec::with_capacity(to_submit.len());
        for node in &to_submit {
            submitted_nodes.push(node.submit_next_step(&self.backend).await?);
        }
        let submitted: Vec<String> = submitted_nodes.iter().map(|n| n.name.clone()).collect();

        // Submissions that resolved on the spot (no-ops, or a backend that
        // finished synchronously) skip the monitor.
        let (in_flight, settled): (Vec<PlanNode>, Vec<PlanNode>) = submitted_nodes
            .into_iter()
            .partition(|n| n.status == NodeStatus::Running);

        let mut next = plan.clone();
        let mut noops = Vec::new();
        for node in &settled {
            if node.is_noop() {
                info!(node = %node.name, status = %node.status, "submission was a no-op");
                noops.push(node.name.clone());
            }
            next = next.apply_node_update(node);
        }

        let mut batch = in_flight;
        batch.extend(running);

        if batch.is_empty() {
            debug!("nothing in flight this round; skipping monitor");
        } else {
            let updated = monitor(batch, &self.backend, &self.options.monitor).await?;
            for node in &updated {
                if next.node(&node.name) != Some(node) {
                    next = next.apply_node_update(node);
                }
            }
        }

        let changed = plan
            .by_priority()
            .into_iter()
            .filter(|n| next.node(&n.name).map(|m| m.status) != Some(n.status))
            .map(|n| n.name.clone())
            .collect();

        Ok(RoundStep {
            plan: next,
            submitted,
            noops,
            changed,
        })
    }
}

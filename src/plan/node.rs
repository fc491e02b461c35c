// src/plan/node.rs

//! Per-node state machine.
//!
//! A [`PlanNode`] is one project's progress through its step list. Nodes are
//! values: [`PlanNode::submit_next_step`] and [`PlanNode::poll`] never modify
//! `self`, they return the next version of the node.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::backend::{Backend, Job, JobState};
use crate::catalog::{self, Step};
use crate::errors::{Result, TierflowError};
use crate::plan::status::NodeStatus;
use crate::types::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub name: String,
    pub project: Project,
    /// Lower runs first. Unique within a plan and fixed at creation.
    pub priority: u32,
    /// Full ordered step list for this run.
    pub steps: Vec<Step>,
    /// Steps not yet submitted.
    pub remaining: VecDeque<Step>,
    pub current_step: Option<Step>,
    pub current_job: Option<Job>,
    /// Every job submitted for this node, oldest first.
    pub jobs: Vec<Job>,
    pub status: NodeStatus,
}

impl PlanNode {
    pub fn new(project: Project, priority: u32, steps: Vec<Step>, status: NodeStatus) -> Self {
        Self {
            name: project.name.clone(),
            remaining: steps.iter().copied().collect(),
            project,
            priority,
            steps,
            current_step: None,
            current_job: None,
            jobs: Vec::new(),
            status,
        }
    }

    /// Whether the current job was reported as a no-op by the backend.
    pub fn is_noop(&self) -> bool {
        self.current_job.as_ref().is_some_and(|job| job.noop)
    }

    /// Status implied by the current job and the remaining queue.
    ///
    /// Nodes without a job keep whatever status the plan gave them
    /// (Planned, Skippable, Runnable or Blocked).
    pub fn derive_status(&self) -> NodeStatus {
        match &self.current_job {
            Some(job) => status_from_job(job, self.remaining.is_empty()),
            None => self.status,
        }
    }

    /// Start the next queued step and return the advanced node.
    ///
    /// The node must be `Runnable`, either for its first step or because its
    /// previous step just succeeded.
    pub async fn submit_next_step<B>(&self, backend: &B) -> Result<PlanNode>
    where
        B: Backend + ?Sized,
    {
        if self.status != NodeStatus::Runnable {
            return Err(TierflowError::NodeNotRunnable {
                node: self.name.clone(),
                status: self.status,
            });
        }

        let mut next = self.clone();
        let step = next
            .remaining
            .pop_front()
            .ok_or_else(|| TierflowError::NothingToSubmit(self.name.clone()))?;

        let project_type = self.project.project_type;
        let action = catalog::action_for(project_type, step)
            .ok_or(TierflowError::MissingAction { project_type, step })?;

        info!(
            node = %self.name,
            step = %step,
            action = %action,
            remaining = next.remaining.len(),
            "submitting step"
        );

        let job = backend.start(&self.project, action).await?;
        debug!(node = %self.name, job = %job.id, state = %job.state, noop = job.noop, "backend accepted step");

        next.current_step = Some(step);
        next.jobs.push(job.clone());
        next.current_job = Some(job);
        next.status = next.derive_status();
        Ok(next)
    }

    /// Refresh the current job and recompute status.
    ///
    /// When the job's state has not changed the returned node is identical to
    /// `self`, so callers never see spurious updates.
    pub async fn poll<B>(&self, backend: &B) -> Result<PlanNode>
    where
        B: Backend + ?Sized,
    {
        let Some(current) = &self.current_job else {
            return Ok(self.clone());
        };

        let fresh = backend.poll(current).await?;
        if fresh.state == current.state {
            return Ok(self.clone());
        }

        debug!(
            node = %self.name,
            job = %fresh.id,
            from = %current.state,
            to = %fresh.state,
            "job state changed"
        );

        let mut next = self.clone();
        match next.jobs.iter_mut().rev().find(|job| job.id == fresh.id) {
            Some(slot) => *slot = fresh.clone(),
            None => next.jobs.push(fresh.clone()),
        }
        next.current_job = Some(fresh);
        next.status = next.derive_status();
        Ok(next)
    }
}

fn status_from_job(job: &Job, queue_empty: bool) -> NodeStatus {
    match job.state {
        JobState::Pending | JobState::Running => NodeStatus::Running,
        JobState::Succeeded if queue_empty => NodeStatus::Succeeded,
        // More steps queued: ready to submit the next one.
        JobState::Succeeded => NodeStatus::Runnable,
        JobState::Failed => NodeStatus::Failed,
        JobState::Canceled => NodeStatus::Canceled,
    }
}

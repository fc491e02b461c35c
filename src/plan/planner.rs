// src/plan/planner.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog;
use crate::dag::DagGraph;
use crate::errors::{Result, TierflowError};
use crate::plan::node::PlanNode;
use crate::plan::status::{NodeStatus, PlanStatus};
use crate::types::Project;

/// All nodes of one run, plus the graph they were built from.
///
/// A `Plan` is a value. [`Plan::apply_node_update`] returns a new plan rather
/// than changing this one, so each scheduling round leaves a snapshot behind.
#[derive(Debug, Clone)]
pub struct Plan {
    nodes: BTreeMap<String, PlanNode>,
    graph: Arc<DagGraph>,
    starting_tier: usize,
}

impl Plan {
    /// Build a plan with one node per graph vertex.
    ///
    /// Priorities run tier-major, then in declaration order within a tier.
    /// Nodes below `starting_tier` are seeded `Skippable`, everything else
    /// `Planned`; the unlock rule then makes every node whose predecessors are
    /// all satisfied `Runnable`.
    pub fn from_graph(
        graph: Arc<DagGraph>,
        projects: &BTreeMap<String, Project>,
        starting_tier: usize,
        train: bool,
    ) -> Result<Self> {
        let mut nodes = Vec::with_capacity(graph.len());
        let mut priority: u32 = 0;

        for (&tier, names) in graph.tiers() {
            for name in names {
                let project = projects
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TierflowError::UnknownProject(name.clone()))?;
                let steps = catalog::steps_for(project.project_type, train);
                let status = if tier < starting_tier {
                    NodeStatus::Skippable
                } else {
                    NodeStatus::Planned
                };
                nodes.push(PlanNode::new(project, priority, steps, status));
                priority += 1;
            }
        }

        Self::from_nodes(graph, nodes, starting_tier)
    }

    /// Build a plan from prepared nodes, e.g. with custom step lists.
    ///
    /// Every graph vertex needs exactly one node. Seeded statuses are kept
    /// except that the unlock rule is applied once.
    pub fn from_nodes(
        graph: Arc<DagGraph>,
        nodes: Vec<PlanNode>,
        starting_tier: usize,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        let mut priorities = HashSet::new();

        for node in nodes {
            if !graph.contains(&node.name) {
                return Err(TierflowError::UnknownProject(node.name));
            }
            if !priorities.insert(node.priority) {
                return Err(TierflowError::ConfigError(format!(
                    "priority {} is used by more than one node",
                    node.priority
                )));
            }
            map.insert(node.name.clone(), node);
        }

        if let Some(missing) = graph.projects().find(|name| !map.contains_key(*name)) {
            return Err(TierflowError::ConfigError(format!(
                "graph project '{}' has no plan node",
                missing
            )));
        }

        let mut plan = Self {
            nodes: map,
            graph,
            starting_tier,
        };
        plan.unlock_ready();

        info!(
            nodes = plan.nodes.len(),
            starting_tier,
            runnable = ?plan.names_with_status(NodeStatus::Runnable),
            "built plan"
        );
        Ok(plan)
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn starting_tier(&self) -> usize {
        self.starting_tier
    }

    pub fn node(&self, name: &str) -> Option<&PlanNode> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes sorted by ascending priority.
    pub fn by_priority(&self) -> Vec<&PlanNode> {
        let mut ordered: Vec<&PlanNode> = self.nodes.values().collect();
        ordered.sort_by_key(|n| n.priority);
        ordered
    }

    /// Names of nodes with `status`, in priority order.
    pub fn names_with_status(&self, status: NodeStatus) -> Vec<String> {
        self.by_priority()
            .into_iter()
            .filter(|n| n.status == status)
            .map(|n| n.name.clone())
            .collect()
    }

    /// A plan is terminal once no node is Planned, Runnable or Running.
    pub fn is_terminal(&self) -> bool {
        !self.nodes.values().any(|n| n.status.is_in_progress())
    }

    pub fn status(&self) -> PlanStatus {
        if self.is_terminal() {
            let all_ok = self
                .nodes
                .values()
                .all(|n| n.status.satisfies_dependents());
            return if all_ok {
                PlanStatus::Succeeded
            } else {
                PlanStatus::Failed
            };
        }

        let started = self
            .nodes
            .values()
            .any(|n| !n.jobs.is_empty() || n.status.is_terminal());
        if started {
            PlanStatus::Running
        } else {
            PlanStatus::Planned
        }
    }

    /// Planned nodes that can never run: nothing is Runnable or Running, yet
    /// the plan is not terminal (a predecessor was canceled, for example).
    pub fn stalled_nodes(&self) -> Option<Vec<String>> {
        let active = self
            .nodes
            .values()
            .any(|n| matches!(n.status, NodeStatus::Runnable | NodeStatus::Running));
        if active || self.is_terminal() {
            return None;
        }
        Some(self.names_with_status(NodeStatus::Planned))
    }

    /// Fold one changed node into the plan and propagate its status.
    ///
    /// - Failed: every transitively downstream node becomes Blocked.
    /// - Succeeded / Skippable: each Planned successor whose predecessors
    ///   are all Succeeded or Skippable becomes Runnable.
    /// - Anything else changes only the node itself.
    pub fn apply_node_update(&self, changed: &PlanNode) -> Plan {
        let mut next = self.clone();

        let Some(slot) = next.nodes.get_mut(&changed.name) else {
            warn!(node = %changed.name, "update for node not in plan; ignoring");
            return next;
        };

        let previous = slot.status;
        *slot = changed.clone();
        let status = changed.status;

        if previous != status {
            info!(node = %changed.name, from = %previous, to = %status, "node status changed");
        }

        match status {
            NodeStatus::Failed => {
                let downstream: Vec<String> = self
                    .graph
                    .downstream(&changed.name)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                for name in &downstream {
                    if let Some(node) = next.nodes.get_mut(name) {
                        node.status = NodeStatus::Blocked;
                    }
                }
                if !downstream.is_empty() {
                    warn!(
                        node = %changed.name,
                        blocked = ?downstream,
                        "node failed; blocking downstream nodes"
                    );
                }
            }
            NodeStatus::Succeeded | NodeStatus::Skippable => {
                let successors: Vec<String> = self
                    .graph
                    .successors(&changed.name)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                for successor in successors {
                    next.unlock_if_ready(&successor);
                }
            }
            _ => {}
        }

        next
    }

    /// A fresh plan over the same graph for re-running what did not finish.
    ///
    /// Succeeded and Skippable nodes become Skippable; every other node starts
    /// over from its first step.
    pub fn reseed_blocked(&self) -> Plan {
        let nodes: BTreeMap<String, PlanNode> = self
            .nodes
            .values()
            .map(|n| {
                let status = if n.status.satisfies_dependents() {
                    NodeStatus::Skippable
                } else {
                    NodeStatus::Planned
                };
                let fresh = PlanNode::new(n.project.clone(), n.priority, n.steps.clone(), status);
                (n.name.clone(), fresh)
            })
            .collect();

        let mut plan = Plan {
            nodes,
            graph: Arc::clone(&self.graph),
            starting_tier: self.starting_tier,
        };
        plan.unlock_ready();

        info!(
            rerun = ?plan.names_with_status(NodeStatus::Runnable),
            "reseeded plan from unfinished nodes"
        );
        plan
    }

    /// Apply the unlock rule to every Planned node.
    fn unlock_ready(&mut self) {
        let planned = self.names_with_status(NodeStatus::Planned);
        for name in planned {
            self.unlock_if_ready(&name);
        }
    }

    /// Planned -> Runnable once every predecessor is Succeeded or Skippable.
    ///
    /// Nodes in any other status are left alone, so Blocked stays Blocked.
    fn unlock_if_ready(&mut self, name: &str) {
        let ready = self.graph.predecessors(name).iter().all(|pred| {
            self.nodes
                .get(*pred)
                .is_some_and(|n| n.status.satisfies_dependents())
        });

        if let Some(node) = self.nodes.get_mut(name) {
            if ready && node.status == NodeStatus::Planned {
                debug!(node = %name, "all predecessors satisfied; marking Runnable");
                node.status = NodeStatus::Runnable;
            }
        }
    }
}

// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

use crate::config::model::ConfigFile;
use crate::errors::{Result, TierflowError};

/// Project dependency DAG with a precomputed tier index.
///
/// Edge direction is `dependency -> dependent`, so for
///
/// ```toml
/// [project.B]
/// after = ["A"]
/// ```
///
/// there is an edge `A -> B`. Node indices follow declaration order, which is
/// also the tie-break order inside a tier.
#[derive(Debug, Clone)]
pub struct DagGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    tiers: BTreeMap<usize, Vec<String>>,
    tier_of: HashMap<String, usize>,
}

impl DagGraph {
    /// Build a DAG from `(name, dependencies)` pairs in declaration order.
    ///
    /// Rejects duplicate names, unknown or self dependencies and cycles.
    pub fn from_dependencies<I, N, D, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<(String, Vec<String>)> = entries
            .into_iter()
            .map(|(name, deps)| (name.into(), deps.into_iter().map(Into::into).collect()))
            .collect();

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for (name, _) in entries.iter() {
            if index.contains_key(name) {
                return Err(TierflowError::ConfigError(format!(
                    "project '{}' is declared more than once",
                    name
                )));
            }
            let idx = graph.add_node(name.clone());
            index.insert(name.clone(), idx);
        }

        for (name, deps) in entries.iter() {
            let to = index[name];
            for dep in deps {
                if dep == name {
                    return Err(TierflowError::ConfigError(format!(
                        "project '{}' cannot depend on itself in `after`",
                        name
                    )));
                }
                let from = index.get(dep).copied().ok_or_else(|| {
                    TierflowError::ConfigError(format!(
                        "project '{}' has unknown dependency '{}' in `after`",
                        name, dep
                    ))
                })?;
                graph.update_edge(from, to, ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            TierflowError::DagCycle(format!(
                "cycle detected in project DAG involving project '{}'",
                graph[cycle.node_id()]
            ))
        })?;

        // Topological order guarantees every predecessor already has a tier.
        let mut tier_by_index: HashMap<NodeIndex, usize> = HashMap::new();
        for idx in order {
            let tier = graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|pred| tier_by_index[&pred] + 1)
                .max()
                .unwrap_or(0);
            tier_by_index.insert(idx, tier);
        }

        let mut tiers: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        let mut tier_of = HashMap::new();
        for idx in graph.node_indices() {
            let tier = tier_by_index[&idx];
            tiers.entry(tier).or_default().push(graph[idx].clone());
            tier_of.insert(graph[idx].clone(), tier);
        }

        Ok(Self {
            graph,
            index,
            tiers,
            tier_of,
        })
    }

    /// Build a DAG from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::from_dependencies(
            cfg.project
                .iter()
                .map(|(name, project)| (name.clone(), project.after.clone())),
        )
    }

    /// Return all project names in declaration order.
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Tier -> project names, ordered by tier then declaration order.
    pub fn tiers(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.tiers
    }

    pub fn tier_of(&self, name: &str) -> Option<usize> {
        self.tier_of.get(name).copied()
    }

    /// Immediate dependents of a project.
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Immediate dependencies of a project (its `after` list).
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Every project transitively reachable from `name`, excluding `name`.
    pub fn downstream(&self, name: &str) -> Vec<&str> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };

        let mut reached = Vec::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                reached.push(idx);
            }
        }
        reached.sort();
        reached
            .into_iter()
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };

        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        found.sort();
        found
            .into_iter()
            .map(|n| self.graph[n].as_str())
            .collect()
    }
}

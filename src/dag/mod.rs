// src/dag/mod.rs

//! Project dependency graph.
//!
//! [`graph`] holds the DAG with its tier index and the successor,
//! predecessor and downstream lookups the planner needs.

pub mod graph;

pub use graph::DagGraph;

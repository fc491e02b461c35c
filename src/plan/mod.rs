// src/plan/mod.rs

//! Plans and their execution.
//!
//! - [`status`] holds the node and plan status enums.
//! - [`node`] is the per-node state machine (submit the next step, poll).
//! - [`monitor`] blocks on a batch of running nodes until one changes.
//! - [`planner`] holds every node of a run and applies the propagation rule.
//! - [`scheduler`] runs the priority- and concurrency-bounded loop.
//! - [`snapshot`] writes per-round JSON records.

pub mod monitor;
pub mod node;
pub mod planner;
pub mod scheduler;
pub mod snapshot;
pub mod status;

pub use monitor::{MonitorOptions, monitor};
pub use node::PlanNode;
pub use planner::Plan;
pub use scheduler::{RoundStep, Scheduler, SchedulerOptions};
pub use snapshot::{NodeRecord, PlanSnapshot, write_snapshot};
pub use status::{NodeStatus, PlanStatus};

// src/backend/mod.rs

//! Backend abstraction: where steps actually run.
//!
//! The scheduler never computes anything itself. It asks a [`Backend`] to
//! start an [`Action`] for a project, gets a [`Job`] back, and later asks the
//! backend for a fresh snapshot of that job.
//!
//! - [`command`] provides `CommandBackend`, which runs a configured shell
//!   command per action and is what the `tierflow` binary uses.
//! - [`fingerprint`] hashes project inputs so `CommandBackend` can report
//!   no-op submissions.
//! - Tests plug in a scripted backend instead (see the test-utils crate).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::catalog::Action;
use crate::errors::Result;
use crate::types::Project;

pub mod command;
pub mod fingerprint;

pub use command::CommandBackend;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle state of a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Canceled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Snapshot of one submitted step.
///
/// Jobs are plain values: polling never mutates a `Job`, it returns a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub action: Action,
    pub state: JobState,
    /// Set when the backend decided the step's output was already current and
    /// nothing was started. A no-op job is always `Succeeded`.
    pub noop: bool,
    pub description: String,
}

impl Job {
    pub fn new(id: impl Into<String>, action: Action, state: JobState) -> Self {
        Self {
            id: id.into(),
            action,
            state,
            noop: false,
            description: String::new(),
        }
    }

    /// A job that was never started because its output is already current.
    pub fn noop(id: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            action,
            state: JobState::Succeeded,
            noop: true,
            description: "No-op: output already up to date".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Same job, different state.
    pub fn with_state(&self, state: JobState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// Trait abstracting the external system that runs steps.
///
/// Production code uses [`CommandBackend`]; tests provide a scripted
/// implementation. Both calls must return promptly: `start` requests
/// asynchronous execution and `poll` only reads current state.
pub trait Backend: Send + Sync {
    /// Start `action` for `project` and return the initial job snapshot.
    fn start<'a>(&'a self, project: &'a Project, action: Action) -> BoxFuture<'a, Result<Job>>;

    /// Fetch a fresh snapshot of `job`.
    fn poll<'a>(&'a self, job: &'a Job) -> BoxFuture<'a, Result<Job>>;
}

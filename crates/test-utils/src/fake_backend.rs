use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tierflow::backend::{Backend, BoxFuture, Job, JobState};
use tierflow::catalog::Action;
use tierflow::errors::{Result, TierflowError};
use tierflow::types::Project;
use tracing::debug;

/// How a scripted job ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Fail,
    Cancel,
    /// Reported as a no-op at submission; never polled.
    Noop,
    /// Stays running forever.
    Hang,
}

/// Outcome plus how many polls the job stays running first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behaviour {
    pub outcome: Outcome,
    pub polls: u32,
}

impl Behaviour {
    pub fn new(outcome: Outcome, polls: u32) -> Self {
        Self { outcome, polls }
    }
}

#[derive(Debug)]
struct FakeJob {
    project: String,
    behaviour: Behaviour,
    polls_left: u32,
    finished: Option<JobState>,
}

#[derive(Debug, Default)]
struct FakeState {
    default: Option<Behaviour>,
    by_project: HashMap<String, Behaviour>,
    by_step: HashMap<(String, String), Behaviour>,
    jobs: HashMap<String, FakeJob>,
    started: Vec<(String, String)>,
    polls: HashMap<String, usize>,
    running_now: usize,
    max_running: usize,
    next_id: u64,
}

/// A scripted backend that:
/// - records every `start` call in order
/// - finishes each job after a configured number of polls
/// - tracks how many jobs were outstanding at once.
///
/// Clones share state, so a test can keep one handle and give another to the
/// scheduler.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    /// Every job succeeds on its first poll unless scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(self, behaviour: Behaviour) -> Self {
        self.state.lock().unwrap().default = Some(behaviour);
        self
    }

    pub fn with_project(self, project: &str, behaviour: Behaviour) -> Self {
        self.state
            .lock()
            .unwrap()
            .by_project
            .insert(project.to_string(), behaviour);
        self
    }

    /// Script a single step of a project; `job` is the action's job name,
    /// e.g. `generate_pairs`.
    pub fn with_step(self, project: &str, job: &str, behaviour: Behaviour) -> Self {
        self.state
            .lock()
            .unwrap()
            .by_step
            .insert((project.to_string(), job.to_string()), behaviour);
        self
    }

    /// `(project, action)` pairs in the order they were started.
    pub fn started(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().started.clone()
    }

    /// Project names in start order (one entry per started step).
    pub fn started_projects(&self) -> Vec<String> {
        self.started().into_iter().map(|(p, _)| p).collect()
    }

    pub fn poll_count(&self, project: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(project)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneously outstanding jobs seen so far.
    pub fn max_running(&self) -> usize {
        self.state.lock().unwrap().max_running
    }

    fn behaviour_for(state: &FakeState, project: &str, job: &str) -> Behaviour {
        state
            .by_step
            .get(&(project.to_string(), job.to_string()))
            .or_else(|| state.by_project.get(project))
            .copied()
            .or(state.default)
            .unwrap_or(Behaviour::new(Outcome::Succeed, 1))
    }

    fn start_sync(&self, project: &Project, action: Action) -> Result<Job> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("fake-{}", state.next_id);
        state
            .started
            .push((project.name.clone(), action.to_string()));

        let behaviour = Self::behaviour_for(&state, &project.name, action.job);
        debug!(project = %project.name, action = %action, job = %id, ?behaviour, "fake start");
        if behaviour.outcome == Outcome::Noop {
            return Ok(Job::noop(id, action));
        }

        state.jobs.insert(
            id.clone(),
            FakeJob {
                project: project.name.clone(),
                behaviour,
                polls_left: behaviour.polls,
                finished: None,
            },
        );
        state.running_now += 1;
        state.max_running = state.max_running.max(state.running_now);

        Ok(Job::new(id, action, JobState::Running))
    }

    fn poll_sync(&self, job: &Job) -> Result<Job> {
        let mut state = self.state.lock().unwrap();
        let FakeState {
            jobs,
            polls,
            running_now,
            ..
        } = &mut *state;

        let fake = jobs
            .get_mut(&job.id)
            .ok_or_else(|| TierflowError::Other(anyhow::anyhow!("unknown job {}", job.id)))?;
        *polls.entry(fake.project.clone()).or_default() += 1;

        if let Some(done) = fake.finished {
            return Ok(job.with_state(done));
        }

        if fake.behaviour.outcome == Outcome::Hang {
            return Ok(job.with_state(JobState::Running));
        }

        fake.polls_left = fake.polls_left.saturating_sub(1);
        if fake.polls_left > 0 {
            return Ok(job.with_state(JobState::Running));
        }

        let done = match fake.behaviour.outcome {
            Outcome::Fail => JobState::Failed,
            Outcome::Cancel => JobState::Canceled,
            _ => JobState::Succeeded,
        };
        fake.finished = Some(done);
        *running_now -= 1;
        Ok(job.with_state(done))
    }
}

impl Backend for FakeBackend {
    fn start<'a>(&'a self, project: &'a Project, action: Action) -> BoxFuture<'a, Result<Job>> {
        Box::pin(async move { self.start_sync(project, action) })
    }

    fn poll<'a>(&'a self, job: &'a Job) -> BoxFuture<'a, Result<Job>> {
        Box::pin(async move { self.poll_sync(job) })
    }
}

// src/backend/command.rs

//! Shell-command backend.
//!
//! Every catalog action is mapped (via `[actions]` in the config) to a shell
//! command. `start` spawns the command without waiting for it; `poll` checks
//! whether the child has exited yet. Exit code 0 is success, any other code is
//! failure, and a child killed by a signal counts as canceled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, anyhow};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::backend::fingerprint::{
    FileFingerprintStore, FingerprintStore, MemoryFingerprintStore, compute_fingerprint,
    fingerprint_key,
};
use crate::backend::{Backend, BoxFuture, Job, JobState};
use crate::catalog::Action;
use crate::errors::{Result, TierflowError};
use crate::types::{FingerprintStorage, Project};

/// A spawned child plus what to record once it succeeds.
struct TrackedJob {
    child: Child,
    /// `(key, hash)` to store when the job succeeds.
    fingerprint: Option<(String, String)>,
}

/// Production backend that runs one shell command per step.
pub struct CommandBackend {
    commands: HashMap<String, String>,
    root: PathBuf,
    fingerprints: Mutex<Box<dyn FingerprintStore>>,
    jobs: Mutex<HashMap<String, TrackedJob>>,
    /// Final states of reaped children, so a stale poll still answers.
    finished: Mutex<HashMap<String, JobState>>,
    next_id: AtomicU64,
}

impl CommandBackend {
    /// `commands` maps action names (e.g. `mastering.generate_pairs`) to shell
    /// commands. Commands run with `root` as their working directory, and
    /// input globs are resolved against it.
    pub fn new(
        commands: HashMap<String, String>,
        root: PathBuf,
        storage: FingerprintStorage,
    ) -> Self {
        let fingerprints: Box<dyn FingerprintStore> = match storage {
            FingerprintStorage::File => Box::new(FileFingerprintStore::new(root.clone())),
            FingerprintStorage::Memory => Box::new(MemoryFingerprintStore::new()),
        };

        Self {
            commands,
            root,
            fingerprints: Mutex::new(fingerprints),
            jobs: Mutex::new(HashMap::new()),
            finished: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of child processes started but not yet reaped.
    pub fn live_jobs(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    fn start_inner(&self, project: &Project, action: Action) -> Result<Job> {
        let action_name = action.name();
        let cmd_line = self.commands.get(&action_name).ok_or_else(|| {
            TierflowError::ConfigError(format!(
                "no command configured for action '{}' (needed by project '{}')",
                action_name, project.name
            ))
        })?;

        let id = format!("job-{}", self.next_id.fetch_add(1, Ordering::Relaxed));

        let fingerprint = self.current_fingerprint(project, action)?;
        if let Some((key, hash)) = &fingerprint {
            let stored = lock(&self.fingerprints)?.load(key)?;
            if stored.as_deref() == Some(hash.as_str()) {
                info!(
                    project = %project.name,
                    action = %action,
                    job = %id,
                    "inputs unchanged since last success; reporting no-op"
                );
                return Ok(Job::noop(id, action));
            }
        }

        info!(
            project = %project.name,
            action = %action,
            job = %id,
            cmd = %cmd_line,
            "starting step process"
        );

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd_line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd_line);
            c
        };

        cmd.current_dir(&self.root)
            .env("TIERFLOW_PROJECT", &project.name)
            .env("TIERFLOW_PROJECT_TYPE", project.project_type.as_str())
            .env("TIERFLOW_ACTION", &action_name)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for action '{}' of '{}'", action_name, project.name))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, id.clone(), "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, id.clone(), "stderr");
        }

        lock(&self.jobs)?.insert(
            id.clone(),
            TrackedJob { child, fingerprint },
        );

        Ok(Job::new(id, action, JobState::Running).with_description(cmd_line.clone()))
    }

    fn poll_inner(&self, job: &Job) -> Result<Job> {
        if job.noop || job.state.is_terminal() {
            return Ok(job.clone());
        }

        if let Some(state) = lock(&self.finished)?.get(&job.id).copied() {
            return Ok(job.with_state(state));
        }

        let mut jobs = lock(&self.jobs)?;
        let tracked = jobs
            .get_mut(&job.id)
            .ok_or_else(|| anyhow!("unknown job id '{}'", job.id))?;

        let status = tracked
            .child
            .try_wait()
            .with_context(|| format!("waiting for process of job '{}'", job.id))?;

        let Some(status) = status else {
            return Ok(job.with_state(JobState::Running));
        };

        let state = state_from_exit(status);
        let fingerprint = jobs.remove(&job.id).and_then(|t| t.fingerprint);
        drop(jobs);
        lock(&self.finished)?.insert(job.id.clone(), state);

        info!(
            job = %job.id,
            action = %job.action,
            exit_code = status.code().unwrap_or(-1),
            state = %state,
            "step process exited"
        );

        if state == JobState::Succeeded {
            if let Some((key, hash)) = fingerprint {
                lock(&self.fingerprints)?.save(&key, &hash)?;
            }
        }

        Ok(job.with_state(state))
    }

    fn current_fingerprint(
        &self,
        project: &Project,
        action: Action,
    ) -> Result<Option<(String, String)>> {
        let hash = compute_fingerprint(&self.root, &project.inputs)?;
        Ok(hash.map(|h| (fingerprint_key(&project.name, action.job), h)))
    }
}

impl Backend for CommandBackend {
    fn start<'a>(&'a self, project: &'a Project, action: Action) -> BoxFuture<'a, Result<Job>> {
        Box::pin(async move { self.start_inner(project, action) })
    }

    fn poll<'a>(&'a self, job: &'a Job) -> BoxFuture<'a, Result<Job>> {
        Box::pin(async move { self.poll_inner(job) })
    }
}

fn state_from_exit(status: ExitStatus) -> JobState {
    match status.code() {
        Some(0) => JobState::Succeeded,
        Some(_) => JobState::Failed,
        // No exit code means the process was terminated by a signal.
        None => JobState::Canceled,
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| TierflowError::Other(anyhow!("command backend lock poisoned")))
}

/// Always consume child output so pipe buffers don't fill; log at debug.
fn forward_lines<R>(reader: R, job: String, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!(job = %job, stream, "{}", line),
                Ok(None) => break,
                Err(e) => {
                    warn!(job = %job, stream, error = %e, "failed reading process output");
                    break;
                }
            }
        }
    });
}

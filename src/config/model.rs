// src/config/model.rs

use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{FingerprintStorage, Project, ProjectType};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// concurrency_level = 2
/// starting_tier = 0
///
/// [actions]
/// "mastering.generate_pairs" = "pipeline pairs $TIERFLOW_PROJECT"
///
/// [project.customers]
/// type = "mastering"
/// after = ["customers_schema"]
/// ```
///
/// This is the unvalidated shape; use `ConfigFile::try_from` (or
/// `config::load_and_validate`) to get a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Execution settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Backend action name -> shell command, from `[actions]`.
    #[serde(default)]
    pub actions: BTreeMap<String, String>,

    /// All projects from `[project.<name>]`.
    #[serde(default)]
    pub project: BTreeMap<String, ProjectConfig>,
}

/// A validated configuration: every `after` reference exists, the project
/// graph is acyclic and the numeric settings are in range.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    inner: RawConfigFile,
}

impl ConfigFile {
    /// Wrap a raw config without validating it. Only `validate` should call this.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self { inner: raw }
    }

    /// Projects as the scheduler sees them, keyed by name.
    pub fn projects(&self) -> BTreeMap<String, Project> {
        self.inner
            .project
            .iter()
            .map(|(name, pc)| {
                (
                    name.clone(),
                    Project::new(name.clone(), pc.project_type).with_inputs(pc.inputs.clone()),
                )
            })
            .collect()
    }

    pub fn into_raw(self) -> RawConfigFile {
        self.inner
    }
}

impl Deref for ConfigFile {
    type Target = RawConfigFile;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of simultaneously running backend jobs.
    #[serde(default = "default_concurrency_level")]
    pub concurrency_level: usize,

    /// Projects in tiers below this one are treated as already done.
    #[serde(default)]
    pub starting_tier: usize,

    /// Whether mastering/categorization pipelines include `apply_feedback`.
    #[serde(default)]
    pub train: bool,

    /// Seconds to sleep between polls of running jobs.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Days to wait for any status change before giving up.
    #[serde(default = "default_timeout_days")]
    pub timeout_days: u64,

    /// Directory for per-round plan snapshots. Disabled when absent.
    #[serde(default)]
    pub save_state: Option<PathBuf>,

    #[serde(default)]
    pub fingerprint_storage: FingerprintStorage,
}

fn default_concurrency_level() -> usize {
    2
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_timeout_days() -> u64 {
    2
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            concurrency_level: default_concurrency_level(),
            starting_tier: 0,
            train: false,
            poll_interval_secs: default_poll_interval_secs(),
            timeout_days: default_timeout_days(),
            save_state: None,
            fingerprint_storage: FingerprintStorage::default(),
        }
    }
}

impl ConfigSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_days.saturating_mul(24 * 3600))
    }
}

/// `[project.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project family, e.g. `"mastering"`.
    #[serde(rename = "type")]
    pub project_type: ProjectType,

    /// Projects that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Glob patterns whose contents decide whether a step is a no-op.
    #[serde(default)]
    pub inputs: Vec<String>,
}

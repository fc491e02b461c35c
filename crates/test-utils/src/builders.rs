#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tierflow::config::{ConfigFile, ConfigSection, ProjectConfig, RawConfigFile};
use tierflow::dag::DagGraph;
use tierflow::plan::{MonitorOptions, Plan, SchedulerOptions};
use tierflow::types::{Project, ProjectType};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                actions: BTreeMap::new(),
                project: BTreeMap::new(),
            },
        }
    }

    pub fn with_project(mut self, name: &str, project: ProjectConfig) -> Self {
        self.config.project.insert(name.to_string(), project);
        self
    }

    pub fn with_action(mut self, action: &str, cmd: &str) -> Self {
        self.config.actions.insert(action.to_string(), cmd.to_string());
        self
    }

    pub fn concurrency_level(mut self, level: usize) -> Self {
        self.config.config.concurrency_level = level;
        self
    }

    pub fn starting_tier(mut self, tier: usize) -> Self {
        self.config.config.starting_tier = tier;
        self
    }

    pub fn train(mut self, val: bool) -> Self {
        self.config.config.train = val;
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProjectConfig`.
pub struct ProjectConfigBuilder {
    project: ProjectConfig,
}

impl ProjectConfigBuilder {
    pub fn new(project_type: ProjectType) -> Self {
        Self {
            project: ProjectConfig {
                project_type,
                after: vec![],
                inputs: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.project.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.project.inputs.push(pattern.to_string());
        self
    }

    pub fn build(self) -> ProjectConfig {
        self.project
    }
}

/// Build a plan straight from `(name, deps)` pairs, every project of the
/// given type.
pub fn plan_from_edges(
    entries: &[(&str, &[&str])],
    project_type: ProjectType,
    starting_tier: usize,
    train: bool,
) -> Plan {
    let graph = DagGraph::from_dependencies(
        entries
            .iter()
            .map(|(name, deps)| (name.to_string(), deps.iter().map(|d| d.to_string()).collect::<Vec<_>>())),
    )
    .expect("valid test graph");

    let projects: BTreeMap<String, Project> = entries
        .iter()
        .map(|(name, _)| (name.to_string(), Project::new(*name, project_type)))
        .collect();

    Plan::from_graph(Arc::new(graph), &projects, starting_tier, train).expect("valid test plan")
}

/// The diamond `A -> B, A -> C, (B, C) -> D` with single-step projects.
pub fn diamond_plan() -> Plan {
    plan_from_edges(
        &[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])],
        ProjectType::SchemaMapping,
        0,
        false,
    )
}

/// Scheduler options that poll every millisecond, for tests against
/// `FakeBackend`.
pub fn fast_scheduler_options(concurrency_level: usize) -> SchedulerOptions {
    SchedulerOptions {
        concurrency_level,
        monitor: MonitorOptions::new(Duration::from_millis(1), Duration::from_secs(60)),
        save_state: None,
    }
}

// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::catalog;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TierflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TierflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_projects(cfg)?;
    validate_global_config(cfg)?;
    validate_actions(cfg)?;
    validate_project_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_projects(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.is_empty() {
        return Err(TierflowError::ConfigError(
            "config must contain at least one [project.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.concurrency_level == 0 {
        return Err(TierflowError::ConfigError(
            "[config].concurrency_level must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.poll_interval_secs == 0 {
        return Err(TierflowError::ConfigError(
            "[config].poll_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.timeout_days == 0 {
        return Err(TierflowError::ConfigError(
            "[config].timeout_days must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Action keys must name catalog actions; a typo would otherwise only surface
/// as a missing command in the middle of a run.
fn validate_actions(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.actions.keys() {
        if !catalog::all_actions().any(|action| action.name() == *key) {
            return Err(TierflowError::ConfigError(format!(
                "[actions] has unknown action '{}'",
                key
            )));
        }
    }
    Ok(())
}

fn validate_project_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, project) in cfg.project.iter() {
        for dep in project.after.iter() {
            if !cfg.project.contains_key(dep) {
                return Err(TierflowError::ConfigError(format!(
                    "project '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(TierflowError::ConfigError(format!(
                    "project '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> project
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.project.keys() {
        graph.add_node(name.as_str());
    }

    for (name, project) in cfg.project.iter() {
        for dep in project.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TierflowError::DagCycle(format!(
                "cycle detected in project DAG involving project '{}'",
                node
            )))
        }
    }
}

// src/lib.rs

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::backend::CommandBackend;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::DagGraph;
use crate::errors::TierflowError;
use crate::plan::{MonitorOptions, NodeStatus, Plan, PlanStatus, Scheduler, SchedulerOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (with CLI overrides)
/// - graph + plan construction
/// - the command backend
/// - the scheduler loop
/// - Ctrl-C handling
///
/// Returns the status of the finished plan.
pub async fn run(args: CliArgs) -> Result<PlanStatus> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let options = scheduler_options(&args, &cfg)?;
    let starting_tier = args.starting_tier.unwrap_or(cfg.config.starting_tier);
    let train = args.train || cfg.config.train;

    let graph = Arc::new(DagGraph::from_config(&cfg)?);
    let plan = Plan::from_graph(graph, &cfg.projects(), starting_tier, train)?;

    if args.dry_run {
        print_dry_run(&plan, &options);
        return Ok(plan.status());
    }

    ensure_commands_for_plan(&plan, &cfg)?;

    let commands: HashMap<String, String> = cfg.actions.clone().into_iter().collect();
    let backend = CommandBackend::new(
        commands,
        config_root_dir(&config_path),
        cfg.config.fingerprint_storage,
    );
    let scheduler = Scheduler::new(backend, options);

    info!(
        projects = plan.len(),
        starting_tier,
        train,
        concurrency = scheduler.options().concurrency_level,
        "starting plan execution"
    );

    // Dropping the scheduler on Ctrl-C kills in-flight child processes.
    let finished = tokio::select! {
        res = scheduler.execute(plan) => res?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            bail!("interrupted before the plan finished");
        }
    };

    print_summary(&finished);
    Ok(finished.status())
}

fn scheduler_options(args: &CliArgs, cfg: &ConfigFile) -> Result<SchedulerOptions> {
    let concurrency_level = args.concurrency.unwrap_or(cfg.config.concurrency_level);
    if concurrency_level == 0 {
        return Err(TierflowError::ConfigError(
            "--concurrency must be >= 1 (got 0)".to_string(),
        )
        .into());
    }

    Ok(SchedulerOptions {
        concurrency_level,
        monitor: MonitorOptions::new(cfg.config.poll_interval(), cfg.config.timeout()),
        save_state: args.save_state.clone().or_else(|| cfg.config.save_state.clone()),
    })
}

/// Fail before starting anything if a step the plan will run has no command.
fn ensure_commands_for_plan(plan: &Plan, cfg: &ConfigFile) -> Result<()> {
    for node in plan.nodes() {
        if node.status == NodeStatus::Skippable {
            continue;
        }
        let project_type = node.project.project_type;
        for &step in &node.steps {
            let action = catalog::action_for(project_type, step)
                .ok_or(TierflowError::MissingAction { project_type, step })?;
            if !cfg.actions.contains_key(&action.name()) {
                return Err(TierflowError::ConfigError(format!(
                    "no command configured in [actions] for '{}' (needed by project '{}')",
                    action.name(),
                    node.name
                ))
                .into());
            }
        }
    }
    Ok(())
}

/// Figure out the directory commands run in and input globs resolve against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Tierflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Tierflow.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: tiers, priorities, initial statuses and steps.
fn print_dry_run(plan: &Plan, options: &SchedulerOptions) {
    println!("tierflow dry-run");
    println!("  concurrency_level = {}", options.concurrency_level);
    println!("  starting_tier = {}", plan.starting_tier());
    println!("  poll_interval = {:?}", options.monitor.poll_interval);
    println!("  timeout = {:?}", options.monitor.timeout);
    println!();

    for (tier, names) in plan.graph().tiers() {
        println!("tier {tier}:");
        for name in names {
            let Some(node) = plan.node(name) else {
                continue;
            };
            println!(
                "  - {name} ({}) priority={} status={}",
                node.project.project_type, node.priority, node.status
            );
            let after = plan.graph().predecessors(name);
            if !after.is_empty() {
                println!("      after: {:?}", after);
            }
            let steps: Vec<&str> = node.steps.iter().map(|s| s.as_str()).collect();
            println!("      steps: {}", steps.join(" -> "));
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(plan: &Plan) {
    println!("plan finished: {}", plan.status());
    for node in plan.by_priority() {
        println!(
            "  {:>4}  {:<10} {} ({} jobs)",
            node.priority,
            node.status.to_string(),
            node.name,
            node.jobs.len()
        );
    }
}

// src/lib.rs

pub mod assets;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod services;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::dag::PlanBuilder;
use crate::engine::Session;
use crate::fs::RealFileSystem;
use crate::registry::TaskRegistry;
use crate::services::Services;
use crate::tasks::registry_from_config;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and task registration
/// - `--list` / `--dry-run` output
/// - the session (executor, watcher, live reload)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let registry = registry_from_config(&cfg)?;

    if args.list {
        print_task_list(&registry);
        return Ok(());
    }

    if args.dry_run {
        let plan = PlanBuilder::new(&registry).build(&args.task)?;
        print!("{plan}");
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    let services = Services::from_config(&cfg)?;
    let session = Session::new(registry, root, Arc::new(RealFileSystem), services);

    // Ctrl-C → graceful shutdown; a second Ctrl-C exits immediately.
    {
        let handle = session.handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; stopping after the current task");
            handle.shutdown();

            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    let report = session.run(&args.task).await?;
    info!(
        task = %args.task,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Finished '{}'",
        args.task
    );
    Ok(())
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitepipe.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for task in registry.tasks() {
        let kind = if task.is_composite() { "composite" } else { "action" };
        match &task.description {
            Some(desc) => println!("  {:<16} {kind:<10} {desc}", task.name),
            None => println!("  {:<16} {kind}", task.name),
        }
        if !task.predecessors.is_empty() {
            println!("  {:<16} after: {}", "", task.predecessors.join(", "));
        }
    }
}

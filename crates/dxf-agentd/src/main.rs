mod config;
mod sleep;

use std::{path::PathBuf, sync::Arc, time::Duration};

use dxf_core::{ExecutorRegistry, Manager, MemoryTaskTable, default_exec_id};
use dxf_observe::{logger_init, node_span};
use dxf_prometheus::PrometheusMetrics;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::config::AgentConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => AgentConfig::load(&path)?,
        None => AgentConfig::default(),
    };

    // 1) Logger
    logger_init(&cfg.logger)?;
    let exec_id = cfg
        .exec_id
        .clone()
        .unwrap_or_else(|| default_exec_id(cfg.port));

    // Everything below, including the manager loops, logs under the node span.
    let span = node_span(&exec_id);
    run(cfg, exec_id).instrument(span).await
}

async fn run(cfg: AgentConfig, exec_id: String) -> anyhow::Result<()> {
    info!("logger initialized");

    // 2) Registry, seeded with the configured tasks
    let table = MemoryTaskTable::new();
    for task in &cfg.tasks {
        table.add_task(task.clone());
        for _ in 0..cfg.subtasks {
            table.add_subtask(task.id, &exec_id);
        }
    }

    // 3) Task types
    let registry = ExecutorRegistry::new().with(
        sleep::TASK_TYPE,
        Arc::new(sleep::SleepFactory {
            table: table.clone(),
            subtask: Duration::from_millis(cfg.subtask_ms),
        }),
    );

    // 4) Manager
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let root = CancellationToken::new();
    let manager = Manager::builder(exec_id, Arc::new(table))
        .config(cfg.manager)
        .executors(registry)
        .metrics(metrics.clone())
        .build(&root)?;

    if let Err(err) = manager.init_meta().await {
        warn!(error = %err, "init meta failed; recovery loop will retry");
    }
    manager.start()?;
    info!("agent is running; press Ctrl+C to stop");

    // 5) Keep running
    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    manager.stop().await;
    info!(metric_families = metrics.gather().len(), "agent stopped");
    Ok(())
}

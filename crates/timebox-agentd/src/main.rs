mod config;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use timebox_api::{DispatcherAdapter, HttpApi};
use timebox_core::{
    DispatchDefaults, Dispatcher, ReconcileConfig, Reconciler, Supervisor, dispatch::DEFAULT_CAPACITY,
};
use timebox_exec::{CommandWorkload, SumRange, Workload, WorkloadRunner, serial};
use timebox_model::Subscribe;
use timebox_observe::{Journal, LoggerConfig, logger_init};

use crate::config::{AgentConfig, WorkloadKind};

/// How long shutdown waits for a running invocation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AgentConfig::from_env().context("reading configuration")?;

    let log = LoggerConfig::from_parts(&cfg.log_level, &cfg.log_format)?;
    logger_init(&log)?;

    serial::install(cfg.lock);
    let mode = serial::probe();
    info!(
        mode = mode.label(),
        build_free_threaded = mode.build_free_threaded,
        version = %mode.version,
        strategy = %cfg.strategy,
        cleanup_children = cfg.cleanup_children,
        "worker starting"
    );

    let workload: Arc<dyn Workload> = match &cfg.workload {
        WorkloadKind::Sum => Arc::new(SumRange),
        WorkloadKind::Command(line) => Arc::new(
            CommandWorkload::from_command_line(line).context("parsing TIMEBOX_COMMAND")?,
        ),
    };
    let runner = WorkloadRunner::new(workload).with_threads(cfg.threads);

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Journal::new())];
    let supervisor = Supervisor::new(runner, Reconciler::system(ReconcileConfig::default()))
        .with_subscribers(subscribers);

    let cancel = CancellationToken::new();
    let (dispatcher, worker) = Dispatcher::start(
        Arc::new(supervisor),
        DispatchDefaults {
            strategy: cfg.strategy,
            reconcile: cfg.cleanup_children,
        },
        DEFAULT_CAPACITY,
        cancel.clone(),
    );

    if let Some(addr) = cfg.http_addr {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding http api to {addr}"))?;
        let router = HttpApi::new(Arc::new(DispatcherAdapter::new(dispatcher.clone()))).router();
        let shutdown = cancel.clone();

        info!(%addr, "http api listening");
        tokio::spawn(async move {
            let served = timebox_api::axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "http api stopped");
            }
        });
    }

    if cfg.run_on_start {
        let id = dispatcher
            .submit(cfg.startup_request())
            .context("submitting startup invocation")?;
        info!(%id, iterations = cfg.iterations, intensity = cfg.intensity, deadline = cfg.deadline_secs, "startup invocation submitted");
    }

    info!("press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, worker).await.is_err() {
        warn!("invocation still running at shutdown; leaving it behind");
    }
    Ok(())
}

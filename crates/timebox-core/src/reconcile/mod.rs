//! Discovery and disposal of processes left behind by abandoned calls.
//!
//! A pass enumerates the worker's descendants, skips helper infrastructure and escalates in two
//! fixed phases: terminate, wait `grace`, kill, wait `grace`. Per-target signal failures (the
//! process already exited, permission denied) never fail the pass.
use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, trace};

use timebox_model::{ChildSnapshot, ProcessDescriptor, ReconcileReport};

mod table;
pub use table::{ProcessTable, Signal, SysProcessTable};

/// Command-line fragments of helper processes that are never touched.
pub const DEFAULT_HELPER_PATTERNS: [&str; 2] = [
    "multiprocessing.resource_tracker",
    "multiprocessing.forkserver",
];

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Wait after each escalation phase.
    pub grace: Duration,
    /// How often liveness is re-checked while waiting.
    pub poll: Duration,
    pub helper_patterns: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(1),
            poll: Duration::from_millis(50),
            helper_patterns: DEFAULT_HELPER_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Two-phase escalation. Each state owns what the next one needs.
enum Escalation {
    Terminate(Vec<ProcessDescriptor>),
    Kill {
        terminated: usize,
        alive: Vec<ProcessDescriptor>,
    },
    Settled(ReconcileReport),
}

pub struct Reconciler {
    table: Arc<dyn ProcessTable>,
    cfg: ReconcileConfig,
}

impl Reconciler {
    pub fn new(table: Arc<dyn ProcessTable>, cfg: ReconcileConfig) -> Self {
        Self { table, cfg }
    }

    /// Reconciler over the real OS process table.
    pub fn system(cfg: ReconcileConfig) -> Self {
        Self::new(Arc::new(SysProcessTable::new()), cfg)
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.cfg
    }

    /// Counts of descendants and zombies right now.
    pub fn snapshot(&self) -> ChildSnapshot {
        let all = self.table.descendants(self.table.current_pid());
        ChildSnapshot {
            children: all.len(),
            zombies: all.iter().filter(|d| d.zombie).count(),
        }
    }

    /// Live, non-helper descendants of the worker.
    pub fn targets(&self) -> Vec<ProcessDescriptor> {
        let me = self.table.current_pid();
        self.table
            .descendants(me)
            .into_iter()
            .filter(|d| d.pid != me && !d.zombie)
            .filter(|d| {
                let helper = d.matches_any(&self.cfg.helper_patterns);
                if helper {
                    trace!(target: "timebox.reconcile", pid = d.pid, cmdline = %d.cmdline, "skipping helper");
                }
                !helper
            })
            .collect()
    }

    /// One reconciliation pass with `grace` per phase.
    #[instrument(level = "debug", target = "timebox.reconcile", skip(self))]
    pub async fn reconcile(&self, grace: Duration) -> ReconcileReport {
        let targets = self.targets();
        if targets.is_empty() {
            return ReconcileReport::default();
        }
        debug!(target: "timebox.reconcile", count = targets.len(), "reconciling leaked descendants");

        let mut state = Escalation::Terminate(targets);
        loop {
            state = match state {
                Escalation::Terminate(targets) => {
                    self.broadcast(&targets, Signal::Terminate);
                    let (gone, alive) = self.wait_for_exit(targets, grace).await;
                    Escalation::Kill {
                        terminated: gone.len(),
                        alive,
                    }
                }
                Escalation::Kill { terminated, alive } => {
                    self.broadcast(&alive, Signal::Kill);
                    let killed = alive.len();
                    let (gone, still) = self.wait_for_exit(alive, grace).await;
                    Escalation::Settled(ReconcileReport {
                        terminated: terminated + gone.len(),
                        killed,
                        remaining: still.len(),
                    })
                }
                Escalation::Settled(report) => return report,
            };
        }
    }

    fn broadcast(&self, targets: &[ProcessDescriptor], signal: Signal) {
        for t in targets {
            if let Err(e) = self.table.signal(t, signal) {
                trace!(target: "timebox.reconcile", pid = t.pid, ?signal, error = %e, "signal not delivered");
            }
        }
    }

    /// Wait up to `timeout` for `targets` to exit; returns `(exited, still_alive)`.
    pub async fn wait_for_exit(
        &self,
        targets: Vec<ProcessDescriptor>,
        timeout: Duration,
    ) -> (Vec<ProcessDescriptor>, Vec<ProcessDescriptor>) {
        let deadline = Instant::now() + timeout;
        let mut gone = Vec::new();
        let mut pending = targets;

        loop {
            if pending.is_empty() {
                break;
            }
            let flags = self.table.alive(&pending);
            let (alive, exited): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .zip(flags.into_iter().chain(std::iter::repeat(false)))
                .partition(|(_, alive)| *alive);
            gone.extend(exited.into_iter().map(|(d, _)| d));
            pending = alive.into_iter().map(|(d, _)| d).collect();

            let now = Instant::now();
            if pending.is_empty() || now >= deadline {
                break;
            }
            sleep(self.cfg.poll.min(deadline - now)).await;
        }
        (gone, pending)
    }
}

//! Iteration loop: drives the deadline enforcer, classifies outcomes and triggers reconciliation.
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

use timebox_exec::{Bounded, WorkloadRunner, run_bounded};
use timebox_model::{
    ChildSnapshot, Event, InvocationId, InvocationSummary, IterationRecord, Outcome, Subscribe,
    TaskInvocation,
};

use crate::reconcile::Reconciler;

const DEFAULT_PAUSE: Duration = Duration::from_millis(200);

pub struct Supervisor {
    runner: WorkloadRunner,
    reconciler: Reconciler,
    subscribers: Vec<Arc<dyn Subscribe>>,
    pause: Duration,
}

impl Supervisor {
    pub fn new(runner: WorkloadRunner, reconciler: Reconciler) -> Self {
        Self {
            runner,
            reconciler,
            subscribers: Vec::new(),
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sleep between iterations.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run every iteration of `inv`. Never fails; failures are recorded per iteration.
    pub async fn run(&self, inv: &TaskInvocation) -> InvocationSummary {
        self.run_as(None, inv).await
    }

    /// Same as [`Supervisor::run`], tagging published events with `id`.
    #[instrument(level = "debug", target = "timebox.iter", skip_all, fields(id = id.map(InvocationId::as_str)))]
    pub async fn run_as(&self, id: Option<&InvocationId>, inv: &TaskInvocation) -> InvocationSummary {
        let mode = self.runner.mode();
        let id = id.cloned();

        debug!(
            target: "timebox.iter",
            iterations = inv.iterations(),
            intensity = inv.intensity(),
            deadline = ?inv.deadline(),
            strategy = %inv.strategy(),
            reconcile = inv.reconcile(),
            mode = mode.label(),
            "invocation started"
        );
        self.publish(&Event::InvocationStarted {
            id: id.clone(),
            mode: mode.clone(),
            strategy: inv.strategy(),
            reconcile: inv.reconcile(),
        });

        let mut last = None;
        for index in 1..=inv.iterations() {
            let record = self.iterate(index, inv).await;
            last = Some(record.outcome);

            debug!(
                target: "timebox.iter",
                index,
                outcome = %record.outcome,
                elapsed = ?record.elapsed,
                children = record.snapshot.children,
                zombies = record.snapshot.zombies,
                reconciled = record.reconcile.is_some(),
                "iteration finished"
            );
            self.publish(&Event::IterationFinished {
                id: id.clone(),
                record,
            });

            sleep(self.pause).await;
        }

        let summary = InvocationSummary {
            mode: mode.label().to_string(),
            last_outcome: last,
            strategy: inv.strategy(),
        };
        self.publish(&Event::InvocationFinished {
            id,
            summary: summary.clone(),
        });
        summary
    }

    async fn iterate(&self, index: u32, inv: &TaskInvocation) -> IterationRecord {
        let started = Instant::now();

        let outcome = match run_bounded(
            &self.runner,
            inv.intensity(),
            inv.deadline(),
            inv.strategy(),
        )
        .await
        {
            Ok(Bounded::Completed) => Outcome::Completed,
            Ok(Bounded::TimedOut) => Outcome::TimedOut,
            Err(e) => {
                warn!(target: "timebox.iter", index, error = %e, "iteration failed");
                Outcome::Errored(e.kind())
            }
        };

        let reconcile = if outcome.is_timeout() && inv.reconcile() {
            Some(self.reconciler.reconcile(self.reconciler.config().grace).await)
        } else {
            None
        };

        IterationRecord {
            index,
            outcome,
            elapsed: started.elapsed(),
            snapshot: self.snapshot(),
            reconcile,
        }
    }

    fn snapshot(&self) -> ChildSnapshot {
        panic::catch_unwind(AssertUnwindSafe(|| self.reconciler.snapshot())).unwrap_or_else(|_| {
            warn!(target: "timebox.iter", "child snapshot failed; reporting zero");
            ChildSnapshot::default()
        })
    }

    fn publish(&self, event: &Event) {
        for sub in &self.subscribers {
            if panic::catch_unwind(AssertUnwindSafe(|| sub.on_event(event))).is_err() {
                warn!(target: "timebox.iter", subscriber = sub.name(), event = event.kind(), "subscriber panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{
        ReconcileConfig,
        testing::{Fate, ScriptedTable},
    };
    use std::{sync::Mutex, thread};
    use timebox_exec::{ExecError, ExecResult, SerialLock, SerialMode, Workload, WorkloadContext};
    use timebox_model::{ErrorKind, ReconcileReport, Strategy};

    /// Sleeps `intensity` milliseconds without looking at the interrupt.
    struct Nap;

    impl Workload for Nap {
        fn name(&self) -> &str {
            "nap"
        }
        fn run(&self, ctx: &WorkloadContext) -> ExecResult<()> {
            thread::sleep(Duration::from_millis(ctx.intensity));
            Ok(())
        }
    }

    struct Broken;

    impl Workload for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn run(&self, _ctx: &WorkloadContext) -> ExecResult<()> {
            Err(ExecError::NonZeroExit { code: 1 })
        }
    }

    #[derive(Default)]
    pub(super) struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        pub(super) fn records(&self) -> Vec<IterationRecord> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    Event::IterationFinished { record, .. } => Some(record.clone()),
                    _ => None,
                })
                .collect()
        }

        fn kinds(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(Event::kind).collect()
        }
    }

    impl Subscribe for Recorder {
        fn on_event(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploding;

    impl Subscribe for Exploding {
        fn on_event(&self, _event: &Event) {
            panic!("subscriber bug");
        }
        fn name(&self) -> &'static str {
            "exploding"
        }
    }

    fn runner(workload: impl Workload) -> WorkloadRunner {
        WorkloadRunner::new(Arc::new(workload))
            .with_lock(Arc::new(SerialLock::new(SerialMode::Free)))
    }

    fn scripted(table: Arc<ScriptedTable>) -> Reconciler {
        Reconciler::new(
            table,
            ReconcileConfig {
                grace: Duration::from_millis(30),
                poll: Duration::from_millis(5),
                ..ReconcileConfig::default()
            },
        )
    }

    fn supervisor(workload: impl Workload, table: Arc<ScriptedTable>, rec: Arc<Recorder>) -> Supervisor {
        Supervisor::new(runner(workload), scripted(table))
            .with_subscribers(vec![rec as Arc<dyn Subscribe>])
            .with_pause(Duration::from_millis(1))
    }

    fn invocation(iterations: u32, intensity: u64, deadline: f64, strategy: Strategy, reconcile: bool) -> TaskInvocation {
        TaskInvocation::new(iterations, intensity, deadline, strategy, reconcile).unwrap()
    }

    #[tokio::test]
    async fn one_record_per_iteration() {
        for n in [0u32, 1, 4] {
            let rec = Arc::new(Recorder::default());
            let sup = supervisor(Nap, Arc::default(), rec.clone());

            let summary = sup.run(&invocation(n, 0, 1.0, Strategy::Preemptive, false)).await;

            let records = rec.records();
            assert_eq!(records.len(), n as usize);
            assert_eq!(
                records.iter().map(|r| r.index).collect::<Vec<_>>(),
                (1..=n).collect::<Vec<_>>()
            );
            assert_eq!(rec.kinds().first(), Some(&"invocation_started"));
            assert_eq!(rec.kinds().last(), Some(&"invocation_finished"));
            if n == 0 {
                assert_eq!(summary.last_outcome, None);
                assert_eq!(summary.record().last_outcome, "");
            }
        }
    }

    #[tokio::test]
    async fn fast_workload_completes_under_both_strategies() {
        for strategy in [Strategy::Cooperative, Strategy::Preemptive] {
            let rec = Arc::new(Recorder::default());
            let table = Arc::new(ScriptedTable::default().with(7, "bystander", Fate::Polite));
            let sup = supervisor(Nap, table.clone(), rec.clone());

            let summary = sup.run(&invocation(3, 0, 5.0, strategy, true)).await;

            assert_eq!(summary.last_outcome, Some(Outcome::Completed));
            assert_eq!(summary.strategy, strategy);
            assert!(rec.records().iter().all(|r| r.outcome == Outcome::Completed));
            assert!(rec.records().iter().all(|r| r.reconcile.is_none()));
            assert!(table.signals_to(7).is_empty());
        }
    }

    #[tokio::test]
    async fn errors_are_recorded_and_the_loop_continues() {
        let rec = Arc::new(Recorder::default());
        let sup = supervisor(Broken, Arc::default(), rec.clone());

        let summary = sup.run(&invocation(3, 0, 1.0, Strategy::Cooperative, true)).await;

        assert_eq!(rec.records().len(), 3);
        assert!(
            rec.records()
                .iter()
                .all(|r| r.outcome == Outcome::Errored(ErrorKind::Exit) && r.reconcile.is_none())
        );
        assert_eq!(summary.record().last_outcome, "error:exit");
        assert_eq!(summary.record().use_signals, "true");
    }

    #[tokio::test]
    async fn timeout_triggers_reconciliation_only_when_enabled() {
        let table = Arc::new(ScriptedTable::default().with(9, "leaked worker", Fate::Stubborn));
        let rec = Arc::new(Recorder::default());
        let sup = supervisor(Nap, table.clone(), rec.clone());

        let summary = sup.run(&invocation(2, 300, 0.02, Strategy::Preemptive, true)).await;

        let records = rec.records();
        assert_eq!(summary.last_outcome, Some(Outcome::TimedOut));
        assert_eq!(
            records[0].reconcile,
            Some(ReconcileReport {
                terminated: 1,
                killed: 1,
                remaining: 0,
            })
        );
        assert_eq!(records[0].snapshot.zombies, 1);
        assert_eq!(records[1].reconcile, Some(ReconcileReport::default()));

        let quiet = Arc::new(ScriptedTable::default().with(10, "leaked worker", Fate::Polite));
        let rec = Arc::new(Recorder::default());
        let sup = supervisor(Nap, quiet.clone(), rec.clone());
        sup.run(&invocation(1, 300, 0.02, Strategy::Preemptive, false)).await;

        assert_eq!(rec.records()[0].outcome, Outcome::TimedOut);
        assert!(rec.records()[0].reconcile.is_none());
        assert!(quiet.signals_to(10).is_empty());
    }

    #[tokio::test]
    async fn panicking_subscriber_is_isolated() {
        let rec = Arc::new(Recorder::default());
        let sup = Supervisor::new(runner(Nap), scripted(Arc::default()))
            .with_subscribers(vec![Arc::new(Exploding) as Arc<dyn Subscribe>, rec.clone()])
            .with_pause(Duration::from_millis(1));

        let summary = sup.run(&invocation(2, 0, 1.0, Strategy::Preemptive, false)).await;

        assert_eq!(summary.last_outcome, Some(Outcome::Completed));
        assert_eq!(rec.records().len(), 2);
    }

    #[tokio::test]
    async fn summary_reports_mode_of_the_runner() {
        let sup = Supervisor::new(
            WorkloadRunner::new(Arc::new(Nap))
                .with_lock(Arc::new(SerialLock::new(SerialMode::Serialized))),
            scripted(Arc::default()),
        )
        .with_pause(Duration::ZERO);

        let summary = sup.run(&invocation(1, 0, 1.0, Strategy::Preemptive, false)).await;
        assert_eq!(summary.mode, "serialized");
        assert_eq!(summary.record().use_signals, "false");
    }
}

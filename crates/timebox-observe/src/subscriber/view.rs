use std::borrow::Borrow;

use timebox_model::{Event, Outcome};
use tracing::{info, warn};

/// Flat accessors over an [`Event`], with neutral values for fields the event lacks.
pub trait View {
    fn kind(&self) -> &'static str;
    fn as_id(&self) -> &str;
    fn index(&self) -> u32;
    fn outcome(&self) -> Option<Outcome>;
}

impl<T> View for T
where
    T: Borrow<Event>,
{
    #[inline]
    fn kind(&self) -> &'static str {
        self.borrow().kind()
    }
    #[inline]
    fn as_id(&self) -> &str {
        self.borrow().id().map(|id| id.as_str()).unwrap_or("-")
    }
    #[inline]
    fn index(&self) -> u32 {
        match self.borrow() {
            Event::IterationFinished { record, .. } => record.index,
            _ => 0,
        }
    }
    #[inline]
    fn outcome(&self) -> Option<Outcome> {
        match self.borrow() {
            Event::IterationFinished { record, .. } => Some(record.outcome),
            Event::InvocationFinished { summary, .. } => summary.last_outcome,
            Event::InvocationStarted { .. } => None,
        }
    }
}

#[inline]
pub fn message_for(kind: &str) -> &'static str {
    match kind {
        "invocation_started" => "task_start",
        "iteration_finished" => "iteration",
        "invocation_finished" => "task_done",
        _ => "event",
    }
}

/// Render one event as info-level diagnostic lines on target `timebox.iter`.
pub fn log_event<E: View + Borrow<Event>>(e: E) {
    let msg = message_for(e.kind());

    match e.borrow() {
        Event::InvocationStarted {
            mode,
            strategy,
            reconcile,
            ..
        } => {
            info!(
                target: "timebox.iter",
                id = e.as_id(),
                use_signals = strategy.uses_signals(),
                cleanup_children = reconcile,
                "{msg}"
            );
            info!(
                target: "timebox.iter",
                id = e.as_id(),
                "mode_status mode={} build_free_threaded={} lock_enabled={} version={}",
                mode.label(),
                mode.build_free_threaded,
                mode.lock_enabled,
                mode.version
            );
        }
        Event::IterationFinished { record, .. } => {
            let line = format!(
                "iter={} outcome={} elapsed={:.2}s children={} zombies={}",
                e.index(),
                record.outcome,
                record.elapsed.as_secs_f64(),
                record.snapshot.children,
                record.snapshot.zombies
            );
            match e.outcome() {
                Some(Outcome::Completed) => info!(target: "timebox.iter", id = e.as_id(), "{line}"),
                _ => warn!(target: "timebox.iter", id = e.as_id(), "{line}"),
            }
            if let Some(r) = record.reconcile {
                info!(
                    target: "timebox.iter",
                    id = e.as_id(),
                    "cleanup terminated={} killed={} remaining={}",
                    r.terminated,
                    r.killed,
                    r.remaining
                );
            }
        }
        Event::InvocationFinished { summary, .. } => {
            let rec = summary.record();
            info!(
                target: "timebox.iter",
                id = e.as_id(),
                mode = %rec.mode,
                last_outcome = %rec.last_outcome,
                use_signals = %rec.use_signals,
                "{msg}"
            );
        }
    }
}

use crate::{InvocationId, InvocationSummary, IterationRecord, ModeInfo, Strategy};

/// Diagnostic events published by the iteration loop.
#[derive(Debug, Clone)]
pub enum Event {
    InvocationStarted {
        id: Option<InvocationId>,
        mode: ModeInfo,
        strategy: Strategy,
        reconcile: bool,
    },
    IterationFinished {
        id: Option<InvocationId>,
        record: IterationRecord,
    },
    InvocationFinished {
        id: Option<InvocationId>,
        summary: InvocationSummary,
    },
}

impl Event {
    /// Short symbolic name, for logging and routing.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::InvocationStarted { .. } => "invocation_started",
            Event::IterationFinished { .. } => "iteration_finished",
            Event::InvocationFinished { .. } => "invocation_finished",
        }
    }

    pub fn id(&self) -> Option<&InvocationId> {
        match self {
            Event::InvocationStarted { id, .. }
            | Event::IterationFinished { id, .. }
            | Event::InvocationFinished { id, .. } => id.as_ref(),
        }
    }
}

/// Receiver of diagnostic events.
///
/// Implementations must be cheap; they run inline on the iteration loop. A panicking
/// subscriber is isolated by the publisher and never affects the loop.
pub trait Subscribe: Send + Sync + 'static {
    fn on_event(&self, event: &Event);

    fn name(&self) -> &'static str;
}

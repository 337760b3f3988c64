use timebox_model::{Event, Subscribe};

use crate::subscriber::view::log_event;

/// Diagnostic sink that writes every event to the `tracing` pipeline.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for Journal {
    fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}

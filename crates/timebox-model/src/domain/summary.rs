use serde::{Deserialize, Serialize};

use crate::{Outcome, Strategy};

/// Execution-mode descriptor reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeInfo {
    /// The build can run workloads without the serialization lock.
    pub build_free_threaded: bool,
    /// The serialization lock is in effect for this process.
    pub lock_enabled: bool,
    pub version: String,
}

impl ModeInfo {
    /// Short label used as the summary `mode`.
    pub fn label(&self) -> &'static str {
        if self.lock_enabled {
            "serialized"
        } else {
            "free-threaded"
        }
    }
}

/// Terminal result of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationSummary {
    pub mode: String,
    /// `None` when the invocation ran zero iterations.
    pub last_outcome: Option<Outcome>,
    pub strategy: Strategy,
}

impl InvocationSummary {
    /// Wire record handed back to polling callers.
    pub fn record(&self) -> SummaryRecord {
        SummaryRecord {
            mode: self.mode.clone(),
            last_outcome: self.last_outcome.map(|o| o.label()).unwrap_or_default(),
            use_signals: self.strategy.uses_signals().to_string(),
        }
    }
}

/// `{mode, last_outcome, use_signals}`; every field is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub mode: String,
    pub last_outcome: String,
    pub use_signals: String,
}

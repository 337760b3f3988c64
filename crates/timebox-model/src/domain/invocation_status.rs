use serde::{Deserialize, Serialize};

/// Lifecycle of a submitted invocation as seen by a polling caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvocationStatus {
    /// Accepted and queued.
    Pending,
    /// Iterations are running.
    Running,
    /// All iterations ran; the summary is available.
    Finished,
}

impl InvocationStatus {
    /// Returns `true` once the invocation will not change anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_finished_is_terminal() {
        assert!(InvocationStatus::Finished.is_terminal());
        assert!(!InvocationStatus::Pending.is_terminal());
        assert!(!InvocationStatus::Running.is_terminal());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&InvocationStatus::Running).unwrap();
        assert_eq!(json, r#""running""#);
    }
}

use std::fmt;

use serde::{Serialize, Serializer};

/// Stable classification of a workload failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The workload could not start its process.
    Spawn,
    /// A workload process exited with a non-zero code.
    Exit,
    /// A workload process was terminated by a signal.
    Signal,
    /// I/O failure while driving the workload.
    Io,
    /// The workload panicked.
    Panic,
    /// Any other failure reported by the workload itself.
    Failed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Spawn => "spawn",
            ErrorKind::Exit => "exit",
            ErrorKind::Signal => "signal",
            ErrorKind::Io => "io",
            ErrorKind::Panic => "panic",
            ErrorKind::Failed => "failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single bounded iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    TimedOut,
    Errored(ErrorKind),
}

impl Outcome {
    /// Wire label: `ok`, `timeout` or `error:<kind>`.
    pub fn label(&self) -> String {
        match self {
            Outcome::Completed => "ok".to_string(),
            Outcome::TimedOut => "timeout".to_string(),
            Outcome::Errored(kind) => format!("error:{kind}"),
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Outcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.label())
    }
}

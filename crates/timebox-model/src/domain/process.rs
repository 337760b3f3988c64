/// A process as read from the OS process table.
///
/// Never cached: every reconciliation pass enumerates afresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    pub pid: u32,
    pub parent: Option<u32>,
    /// Start time as reported by the OS; `(pid, start_time)` identifies a process across pid reuse.
    pub start_time: u64,
    /// Arguments joined with a single space. Empty when unreadable (e.g. zombies).
    pub cmdline: String,
    pub zombie: bool,
}

impl ProcessDescriptor {
    /// Returns `true` if the command line contains any of `patterns`.
    pub fn matches_any<S: AsRef<str>>(&self, patterns: &[S]) -> bool {
        patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.is_empty())
            .any(|p| self.cmdline.contains(p))
    }
}

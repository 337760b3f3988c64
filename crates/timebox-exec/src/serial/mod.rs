//! Process-wide serialization lock and the execution-mode probe.
//!
//! When the lock is active, every workload call holds it for its whole duration, so at most one
//! call computes at a time even if earlier calls were abandoned and are still running.
//! The mode is installed once at worker start and only read afterwards.
use std::{
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use timebox_model::ModeInfo;
use tracing::{debug, warn};

static GLOBAL: OnceLock<Arc<SerialLock>> = OnceLock::new();

/// Requested execution model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialMode {
    /// One workload call at a time.
    Serialized,
    /// Workload calls may overlap.
    Free,
}

impl FromStr for SerialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialized" | "gil" | "on" => Ok(SerialMode::Serialized),
            "free" | "free-threaded" | "nogil" | "off" => Ok(SerialMode::Free),
            other => Err(format!("unknown lock mode: {other} (expected: serialized|free)")),
        }
    }
}

/// Whether this build can run workloads without the lock.
#[inline]
pub const fn build_free_threaded() -> bool {
    cfg!(feature = "free-threaded")
}

pub struct SerialLock {
    enabled: bool,
    mutex: Mutex<()>,
}

impl SerialLock {
    /// Builds a lock for `mode`; builds without free-threading support always serialize.
    pub fn new(mode: SerialMode) -> Self {
        let enabled = match mode {
            SerialMode::Serialized => true,
            SerialMode::Free if build_free_threaded() => false,
            SerialMode::Free => {
                warn!(target: "timebox.serial", "free-threaded mode requested but not supported by this build; serializing");
                true
            }
        };
        Self {
            enabled,
            mutex: Mutex::new(()),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Acquire the lock if it is active. Blocks while another call holds it.
    pub fn enter(&self) -> Option<MutexGuard<'_, ()>> {
        if !self.enabled {
            return None;
        }
        Some(self.mutex.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Install the process-wide mode. Returns `false` if a mode was already installed.
pub fn install(mode: SerialMode) -> bool {
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        Arc::new(SerialLock::new(mode))
    });
    if installed {
        debug!(target: "timebox.serial", ?mode, "serialization mode installed");
    }
    installed
}

/// The process-wide lock; free-threaded until [`install`] says otherwise.
pub fn global() -> Arc<SerialLock> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(SerialLock::new(SerialMode::Free))))
}

/// Pure read of the current execution mode.
pub fn probe() -> ModeInfo {
    describe(&global())
}

/// Execution mode as seen by holders of `lock`.
pub fn describe(lock: &SerialLock) -> ModeInfo {
    ModeInfo {
        build_free_threaded: build_free_threaded(),
        lock_enabled: lock.is_enabled(),
        version: version(),
    }
}

fn version() -> String {
    format!(
        "{} {} ({}/{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    #[test]
    fn parse_modes() {
        assert_eq!("GIL".parse::<SerialMode>(), Ok(SerialMode::Serialized));
        assert_eq!("nogil".parse::<SerialMode>(), Ok(SerialMode::Free));
        assert!("maybe".parse::<SerialMode>().is_err());
    }

    #[test]
    fn free_lock_never_blocks() {
        let lock = SerialLock::new(SerialMode::Free);
        assert_eq!(lock.is_enabled(), !build_free_threaded());
        if build_free_threaded() {
            assert!(lock.enter().is_none());
        }
    }

    #[test]
    fn serialized_lock_admits_one_holder() {
        let lock = Arc::new(SerialLock::new(SerialMode::Serialized));
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (lock, inside, peak) = (lock.clone(), inside.clone(), peak.clone());
                thread::spawn(move || {
                    let _guard = lock.enter();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn probe_is_consistent() {
        let a = probe();
        let b = probe();
        assert_eq!(a, b);
        assert_eq!(a.build_free_threaded, build_free_threaded());
        assert!(a.version.starts_with("timebox-exec "));
    }
}

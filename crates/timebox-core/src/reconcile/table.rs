use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Mutex, MutexGuard, PoisonError},
};

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::trace;

use timebox_model::ProcessDescriptor;

/// Signal sent to a reconciliation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Polite request to exit (`SIGTERM`).
    Terminate,
    /// Non-ignorable kill (`SIGKILL`).
    Kill,
}

/// Read and signal the OS process table.
///
/// Calls are blocking and cheap enough to run inline on the async loop.
pub trait ProcessTable: Send + Sync + 'static {
    /// Pid of the worker process itself.
    fn current_pid(&self) -> u32;

    /// All recursive descendants of `root`, zombies included, `root` excluded.
    fn descendants(&self, root: u32) -> Vec<ProcessDescriptor>;

    /// Deliver `signal` to `target`. Errors are per-target and may be ignored by callers.
    fn signal(&self, target: &ProcessDescriptor, signal: Signal) -> io::Result<()>;

    /// For each target, whether that exact process is still running (zombies are not).
    fn alive(&self, targets: &[ProcessDescriptor]) -> Vec<bool>;
}

/// [`ProcessTable`] backed by `sysinfo` for reads and `kill(2)` for signals.
pub struct SysProcessTable {
    sys: Mutex<System>,
    me: u32,
}

impl SysProcessTable {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            me: std::process::id(),
        }
    }

    fn system(&self) -> MutexGuard<'_, System> {
        self.sys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_same_running(sys: &System, target: &ProcessDescriptor) -> bool {
        sys.process(Pid::from_u32(target.pid))
            .map(|p| p.start_time() == target.start_time && p.status() != ProcessStatus::Zombie)
            .unwrap_or(false)
    }
}

impl Default for SysProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysProcessTable {
    fn current_pid(&self) -> u32 {
        self.me
    }

    fn descendants(&self, root: u32) -> Vec<ProcessDescriptor> {
        let mut sys = self.system();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
        for (pid, proc_) in sys.processes() {
            // Threads show up as table entries on Linux; they are not processes we own.
            if proc_.thread_kind().is_some() {
                continue;
            }
            if let Some(parent) = proc_.parent() {
                children.entry(parent).or_default().push(*pid);
            }
        }

        let mut out = Vec::new();
        let mut queue: VecDeque<Pid> = VecDeque::from([Pid::from_u32(root)]);
        while let Some(pid) = queue.pop_front() {
            let Some(kids) = children.get(&pid) else {
                continue;
            };
            for kid in kids {
                let Some(proc_) = sys.process(*kid) else {
                    continue;
                };
                out.push(ProcessDescriptor {
                    pid: kid.as_u32(),
                    parent: Some(pid.as_u32()),
                    start_time: proc_.start_time(),
                    cmdline: join_cmd(proc_.cmd()),
                    zombie: proc_.status() == ProcessStatus::Zombie,
                });
                queue.push_back(*kid);
            }
        }
        trace!(target: "timebox.reconcile", root, count = out.len(), "descendants enumerated");
        out
    }

    fn signal(&self, target: &ProcessDescriptor, signal: Signal) -> io::Result<()> {
        if target.pid == self.me || target.pid <= 1 {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("refusing to signal pid {}", target.pid),
            ));
        }

        {
            let mut sys = self.system();
            let pid = Pid::from_u32(target.pid);
            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing(),
            );
            if !Self::is_same_running(&sys, target) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("pid {} already exited", target.pid),
                ));
            }
        }

        send(target.pid, signal)
    }

    fn alive(&self, targets: &[ProcessDescriptor]) -> Vec<bool> {
        let mut sys = self.system();
        let pids: Vec<Pid> = targets.iter().map(|t| Pid::from_u32(t.pid)).collect();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            true,
            ProcessRefreshKind::nothing(),
        );
        targets
            .iter()
            .map(|t| Self::is_same_running(&sys, t))
            .collect()
    }
}

fn join_cmd(cmd: &[std::ffi::OsString]) -> String {
    cmd.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn send(pid: u32, signal: Signal) -> io::Result<()> {
            let sig = match signal {
                Signal::Terminate => libc::SIGTERM,
                Signal::Kill => libc::SIGKILL,
            };
            let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
            if rc != 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }
    } else {
        fn send(pid: u32, signal: Signal) -> io::Result<()> {
            let mut sys = System::new();
            let pid = Pid::from_u32(pid);
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            let delivered = sys.process(pid).map(|p| p.kill()).unwrap_or(false);
            if delivered {
                Ok(())
            } else {
                Err(io::Error::other(format!("{signal:?} not delivered to pid {pid}")))
            }
        }
    }
}

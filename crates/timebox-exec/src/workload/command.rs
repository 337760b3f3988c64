use std::{
    process::{Command, ExitStatus, Stdio},
    thread,
    time::Duration,
};

use tracing::{debug, trace};

use crate::{
    error::{ExecError, ExecResult},
    workload::{Workload, WorkloadContext},
};

/// Placeholder in arguments replaced with the call's intensity.
pub const INTENSITY_PLACEHOLDER: &str = "{intensity}";

const DEFAULT_POLL: Duration = Duration::from_millis(20);

/// Runs an external program per call and waits for it.
///
/// The program sees the threads hint in `TIMEBOX_THREADS`. If the interrupt fires while it is
/// running, the child is killed and reaped before returning.
#[derive(Debug, Clone)]
pub struct CommandWorkload {
    program: String,
    args: Vec<String>,
    poll: Duration,
}

impl CommandWorkload {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            poll: DEFAULT_POLL,
        }
    }

    /// Parse a whitespace separated command line (`"sleep {intensity}"`).
    pub fn from_command_line(line: &str) -> ExecResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ExecError::MissingProgram)?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, ctx: &WorkloadContext) -> Command {
        let intensity = ctx.intensity.to_string();
        let mut cmd = Command::new(&self.program);
        cmd.args(
            self.args
                .iter()
                .map(|a| a.replace(INTENSITY_PLACEHOLDER, &intensity)),
        );
        cmd.env("TIMEBOX_THREADS", ctx.threads.to_string());
        cmd.stdin(Stdio::null());
        cmd
    }
}

impl Workload for CommandWorkload {
    fn name(&self) -> &str {
        "command"
    }

    fn run(&self, ctx: &WorkloadContext) -> ExecResult<()> {
        if self.program.is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let mut child = self
            .command(ctx)
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {e}", self.program)))?;
        trace!(target: "timebox.exec.command", program = %self.program, pid = child.id(), "spawned");

        loop {
            if let Some(status) = child.try_wait()? {
                return check_status(status);
            }
            if ctx.interrupt.is_cancelled() {
                debug!(target: "timebox.exec.command", pid = child.id(), "interrupted; killing child");
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::Interrupted);
            }
            thread::sleep(self.poll);
        }
    }
}

fn check_status(status: ExitStatus) -> ExecResult<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ExecError::NonZeroExit { code }),
        None => {
            cfg_if::cfg_if! {
                if #[cfg(unix)] {
                    use std::os::unix::process::ExitStatusExt;
                    trace!(target: "timebox.exec.command", signal = ?status.signal(), "terminated by signal");
                }
            }
            Err(ExecError::KilledBySignal)
        }
    }
}

use std::{hint::black_box, thread};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    error::{ExecError, ExecResult},
    workload::{Workload, WorkloadContext, panic_message},
};

/// Items summed between two interrupt checks.
const CHECK_EVERY: u64 = 1 << 16;

/// CPU-bound aggregation: `sum(0..intensity)`, split over `threads` scoped threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumRange;

impl Workload for SumRange {
    fn name(&self) -> &str {
        "sum"
    }

    fn run(&self, ctx: &WorkloadContext) -> ExecResult<()> {
        let n = ctx.intensity;
        let threads = ctx.threads.max(1) as u64;
        let per = n.div_ceil(threads).max(1);

        let parts: Vec<thread::Result<Option<u128>>> = thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let lo = t.saturating_mul(per).min(n);
                    let hi = lo.saturating_add(per).min(n);
                    let interrupt = &ctx.interrupt;
                    s.spawn(move || partial_sum(lo, hi, interrupt))
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut total: u128 = 0;
        for part in parts {
            match part {
                Ok(Some(v)) => total = total.wrapping_add(v),
                Ok(None) => return Err(ExecError::Interrupted),
                Err(payload) => return Err(ExecError::Panicked(panic_message(payload.as_ref()))),
            }
        }
        trace!(target: "timebox.exec.sum", n, total = %total, "sum done");
        Ok(())
    }
}

fn partial_sum(lo: u64, hi: u64, interrupt: &CancellationToken) -> Option<u128> {
    let mut acc: u128 = 0;
    let mut i = lo;
    while i < hi {
        if interrupt.is_cancelled() {
            return None;
        }
        let end = i.saturating_add(CHECK_EVERY).min(hi);
        for v in i..end {
            acc = acc.wrapping_add(black_box(v) as u128);
        }
        i = end;
    }
    Some(acc)
}

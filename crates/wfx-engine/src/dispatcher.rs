//! Parallel dispatch of per-unit workers

use crate::context::RunContext;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};
use wfx_core::{UnitId, UnitOutcome};

/// Run `work` once per unit and return outcomes in `units` order
///
/// Uses a bounded rayon pool of `workers` threads, or the calling thread
/// when `workers <= 1`. A panic inside `work` becomes a `Failed` outcome for
/// that unit only.
pub fn dispatch_with<F>(units: &[UnitId], workers: usize, work: F) -> Vec<(UnitId, UnitOutcome)>
where
    F: Fn(&UnitId) -> UnitOutcome + Send + Sync,
{
    if units.is_empty() {
        return Vec::new();
    }

    let run = |unit: &UnitId| (unit.clone(), isolated(unit, &work));

    if workers <= 1 || units.len() == 1 {
        info!(units = units.len(), "processing serially");
        return units.iter().map(run).collect();
    }

    let threads = workers.min(units.len());
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("wfx-worker-{}", i))
        .build()
    {
        Ok(pool) => {
            info!(units = units.len(), threads, "processing in parallel");
            // Indexed parallel collect keeps input order.
            pool.install(|| units.par_iter().map(run).collect())
        }
        Err(e) => {
            warn!(error = %e, "failed to start worker pool; processing serially");
            units.iter().map(run).collect()
        }
    }
}

/// Run every unit through the per-unit worker
pub fn dispatch(ctx: &Arc<RunContext>, units: &[UnitId]) -> Vec<(UnitId, UnitOutcome)> {
    let ctx = Arc::clone(ctx);
    dispatch_with(units, ctx.workers(), move |unit| crate::worker::process_unit(&ctx, unit))
}

fn isolated<F>(unit: &UnitId, work: &F) -> UnitOutcome
where
    F: Fn(&UnitId) -> UnitOutcome,
{
    catch_unwind(AssertUnwindSafe(|| work(unit))).unwrap_or_else(|payload| {
        let cause = format!("worker panicked: {}", panic_message(payload.as_ref()));
        error!(unit = %unit, "{}", cause);
        UnitOutcome::Failed { cause }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! WFX-Engine: resumable, parallel feature extraction over many units
//!
//! A run validates its configuration once, works out which units still need
//! processing, extracts features for those units on a bounded worker pool,
//! and merges every unit's partial artifact into one final table.

pub mod artifact;
pub mod context;
pub mod dispatcher;
pub mod merge;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod worker;

pub use context::{EngineConfig, RunContext, RunSettings};
pub use report::RunReport;
pub use scheduler::{PreviousOutput, ResumePlan, ResumePlanner};
pub use source::{JsonRecordingSource, RecordingFile, RecordingSource};

use std::sync::Arc;
use tracing::{info, warn};
use wfx_core::WfxResult;

/// Execute a full run: resume planning, dispatch, merge and cleanup
///
/// Only artifact failures during the merge are returned as errors; unit
/// failures are reported in the [`RunReport`].
pub fn run(ctx: Arc<RunContext>) -> WfxResult<RunReport> {
    let columns = ctx.config().schema().columns();
    info!(
        units = ctx.units().len(),
        columns = columns.len(),
        workers = ctx.workers(),
        force = ctx.force(),
        "starting run"
    );

    let previous = if ctx.force() {
        None
    } else {
        PreviousOutput::load(ctx.output(), &ctx.manifest_path(), columns).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable previous output");
            None
        })
    };

    let plan = ResumePlanner::for_context(&ctx, previous.as_ref()).plan(ctx.units());
    let outcomes = dispatcher::dispatch(&ctx, &plan.remaining);
    let merge = merge::merge(&ctx, previous.as_ref())?;

    let report = RunReport {
        output: ctx.output().to_path_buf(),
        requested: ctx.units().len(),
        resumed: plan.skipped,
        outcomes,
        merge,
    };
    report.log();
    Ok(report)
}

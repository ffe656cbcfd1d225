//! Per-unit worker: recording in, partial artifact out

use crate::artifact::{remove_artifact, write_table, OutputRow, WindowSpan};
use crate::context::RunContext;
use tracing::{debug, error, info, info_span, warn};
use wfx_core::{Recording, UnitId, UnitOutcome, WfxResult, Window};
use wfx_processing::{FeatureVector, PlanSkip, ValidatedConfig, WindowExtractor, WindowPlanner};

/// Process one unit and report what happened
///
/// Errors never escape: a missing recording skips the unit, anything else
/// fails it. Either way no partial artifact is left behind.
pub fn process_unit(ctx: &RunContext, unit: &UnitId) -> UnitOutcome {
    let span = info_span!("unit", unit = %unit);
    let _guard = span.enter();

    match run_unit(ctx, unit) {
        Ok(rows) => {
            info!(rows, "unit processed");
            UnitOutcome::Processed { rows }
        }
        Err(e) if e.is_missing_recording() => {
            warn!(error = %e, "skipping unit");
            UnitOutcome::Skipped { reason: e.to_string() }
        }
        Err(e) => {
            error!(error = %e, "unit failed");
            UnitOutcome::Failed { cause: e.to_string() }
        }
    }
}

fn run_unit(ctx: &RunContext, unit: &UnitId) -> WfxResult<usize> {
    // A unit is only dispatched when it is not done, so any partial here is
    // left over from an earlier run and must not survive a failure.
    let partial = ctx.partial_path(unit);
    if remove_artifact(&partial)? {
        debug!(path = %partial.display(), "discarded stale partial");
    }

    debug!(location = %ctx.source().locate(unit), "loading recording");
    let recording = ctx.source().load(unit)?;
    debug!(
        channels = recording.channel_count(),
        samples = recording.n_samples(),
        duration_secs = recording.duration(),
        sample_rate = recording.sample_rate(),
        events = recording.events().len(),
        "recording loaded"
    );

    let rows = extract_rows(ctx.config(), unit, &recording)?;
    let records: Vec<Vec<String>> = rows.iter().map(OutputRow::to_record).collect();
    write_table(&partial, ctx.config().schema().columns(), &records)?;
    Ok(rows.len())
}

/// All output rows of one recording, in emission order
///
/// Conditions follow event order and windows ascend within a condition.
pub fn extract_rows(
    config: &ValidatedConfig,
    unit: &UnitId,
    recording: &Recording,
) -> WfxResult<Vec<OutputRow>> {
    let fs = recording.sample_rate();
    let plan = WindowPlanner::new(config).plan(recording.events(), fs, recording.n_samples());
    for skip in &plan.skips {
        log_skip(skip);
    }

    let mut extractor = WindowExtractor::new(config, recording.channel_labels());
    let rolling = config.schema().has_window_columns();
    let mut rows = Vec::with_capacity(plan.window_count());

    for planned in &plan.conditions {
        let baseline = match &planned.baseline {
            Some(baseline) => {
                let vectors = baseline
                    .windows
                    .iter()
                    .map(|w| extractor.extract(recording.block(w), fs))
                    .collect::<WfxResult<Vec<FeatureVector>>>()?;
                debug!(
                    condition = %planned.condition,
                    reference = %baseline.condition,
                    onset = baseline.onset,
                    windows = vectors.len(),
                    "baseline resolved"
                );
                FeatureVector::nan_mean(&vectors)
            }
            None => None,
        };

        for window in &planned.windows {
            let features = extractor.extract(recording.block(window), fs)?;
            let features = match &baseline {
                Some(mean) => features.subtract(mean),
                None => features,
            };
            rows.push(OutputRow {
                unit: unit.to_string(),
                condition: planned.condition.clone(),
                window: rolling.then(|| span_of(window, recording)),
                features,
            });
        }
    }

    Ok(rows)
}

fn span_of(window: &Window, recording: &Recording) -> WindowSpan {
    WindowSpan {
        index: window.index,
        start: recording.seconds_at(window.start),
        end: recording.seconds_at(window.end),
    }
}

fn log_skip(skip: &PlanSkip) {
    match skip {
        PlanSkip::Unmapped { .. } => debug!("{}", skip),
        PlanSkip::Duplicate { .. } => info!("{}", skip),
        _ => warn!("{}", skip),
    }
}

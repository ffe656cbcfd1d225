//! Merge partial artifacts into the final table, then clean up

use crate::artifact::{read_table, write_manifest, write_table, Manifest};
use crate::context::RunContext;
use crate::scheduler::PreviousOutput;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wfx_core::{UnitId, WfxResult};

/// What the merge produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    /// Units present in the final table, in table order
    pub merged: Vec<UnitId>,
    /// Units merged from rows of an earlier final table
    pub carried: Vec<UnitId>,
    /// Requested units with no rows to merge
    pub missing: Vec<UnitId>,
    pub rows: usize,
}

/// Build the final table in requested order
///
/// Rows come from each unit's partial artifact, or from the previous final
/// table when its manifest lists the unit. Partials are deleted only after the
/// final table and manifest are in place.
pub fn merge(ctx: &RunContext, previous: Option<&PreviousOutput>) -> WfxResult<MergeSummary> {
    let columns = ctx.config().schema().columns();
    let mut summary = MergeSummary::default();
    let mut rows = Vec::new();
    let mut consumed: Vec<PathBuf> = Vec::new();

    for unit in ctx.units() {
        let partial = ctx.partial_path(unit);
        if partial.is_file() {
            match read_table(&partial) {
                Ok(table) if table.columns == columns => {
                    debug!(unit = %unit, rows = table.rows.len(), "merging partial");
                    rows.extend(table.rows);
                    summary.merged.push(unit.clone());
                    consumed.push(partial);
                    continue;
                }
                Ok(_) => warn!(
                    unit = %unit,
                    path = %partial.display(),
                    "partial was written with different columns; rerun with --force"
                ),
                Err(e) => warn!(unit = %unit, error = %e, "unreadable partial"),
            }
        } else if let Some(previous) = previous.filter(|p| p.contains(unit)) {
            rows.extend(previous.rows_for(unit).cloned());
            summary.merged.push(unit.clone());
            summary.carried.push(unit.clone());
            continue;
        }
        summary.missing.push(unit.clone());
    }

    summary.rows = rows.len();
    write_table(ctx.output(), columns, &rows)?;
    write_manifest(
        &ctx.manifest_path(),
        &Manifest {
            columns: columns.to_vec(),
            units: summary.merged.iter().map(|u| u.to_string()).collect(),
        },
    )?;
    info!(
        path = %ctx.output().display(),
        units = summary.merged.len(),
        rows = summary.rows,
        "final table written"
    );

    if !ctx.keep_partials() {
        cleanup(&consumed, ctx.partial_dir());
    }

    Ok(summary)
}

/// Delete merged partials and the partial directory if it ends up empty
///
/// Failures are logged; the final table is already complete.
pub fn cleanup(partials: &[PathBuf], partial_dir: &Path) {
    for path in partials {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "could not remove partial");
        }
    }

    let is_empty = std::fs::read_dir(partial_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        if let Err(e) = std::fs::remove_dir(partial_dir) {
            debug!(path = %partial_dir.display(), error = %e, "partial directory left in place");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EngineConfig, RunSettings};
    use wfx_processing::ExtractionConfig;

    fn context(dir: &Path, units: &[&str], keep_partials: bool) -> RunContext {
        RunContext::new(EngineConfig {
            extraction: ExtractionConfig::eeg_default(),
            run: RunSettings {
                units: units.iter().map(|u| u.to_string()).collect(),
                recording_dir: dir.join("recordings"),
                output: dir.join("features.csv"),
                keep_partials,
                ..RunSettings::default()
            },
        })
        .unwrap()
    }

    fn partial_row(ctx: &RunContext, unit: &str, condition: &str) -> Vec<String> {
        let mut row = vec![unit.to_string(), condition.to_string()];
        row.resize(ctx.config().schema().columns().len(), "0.5".to_string());
        row
    }

    fn write_partial(ctx: &RunContext, unit: &str) {
        let id = UnitId::new(unit).unwrap();
        let rows = vec![partial_row(ctx, unit, "Baseline"), partial_row(ctx, unit, "Task")];
        write_table(&ctx.partial_path(&id), ctx.config().schema().columns(), &rows).unwrap();
    }

    #[test]
    fn test_merge_follows_requested_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), &["P01", "P02", "P03"], false);
        // Completion order 3, 1, 2.
        for unit in ["P03", "P01", "P02"] {
            write_partial(&ctx, unit);
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let summary = merge(&ctx, None).unwrap();
        assert_eq!(summary.rows, 6);
        assert!(summary.missing.is_empty());

        let table = read_table(ctx.output()).unwrap();
        let order: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(order, vec!["P01", "P01", "P02", "P02", "P03", "P03"]);
        assert!(!ctx.partial_dir().exists());
    }

    #[test]
    fn test_missing_units_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), &["P01", "P02", "P03"], true);
        write_partial(&ctx, "P02");

        let summary = merge(&ctx, None).unwrap();
        assert_eq!(summary.merged, vec![UnitId::new("P02").unwrap()]);
        assert_eq!(
            summary.missing,
            vec![UnitId::new("P01").unwrap(), UnitId::new("P03").unwrap()]
        );
        // keep_partials leaves artifacts alone.
        assert!(ctx.partial_path(&UnitId::new("P02").unwrap()).is_file());

        let manifest = crate::artifact::read_manifest(&ctx.manifest_path()).unwrap().unwrap();
        assert_eq!(manifest.units, vec!["P02".to_string()]);
    }

    #[test]
    fn test_mismatched_partial_is_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), &["P01"], false);
        let stale = vec!["Participant_ID".to_string(), "Condition".to_string(), "old".to_string()];
        write_table(&ctx.partial_path(&UnitId::new("P01").unwrap()), &stale, &[]).unwrap();

        let summary = merge(&ctx, None).unwrap();
        assert_eq!(summary.missing.len(), 1);
        // The stale partial survives cleanup and the directory with it.
        assert!(ctx.partial_dir().exists());
    }

    #[test]
    fn test_cleanup_keeps_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let partials = dir.path().join("partials");
        std::fs::create_dir_all(&partials).unwrap();
        let ours = partials.join("P01.csv");
        std::fs::write(&ours, "x").unwrap();
        std::fs::write(partials.join("notes.txt"), "keep").unwrap();

        cleanup(&[ours.clone()], &partials);
        assert!(!ours.exists());
        assert!(partials.join("notes.txt").exists());
    }
}

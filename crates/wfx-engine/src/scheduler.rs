//! Resume planning: which requested units still need work

use crate::artifact::{partial_file, read_manifest, read_table, Table};
use crate::context::RunContext;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use wfx_core::{UnitId, WfxResult};

/// A final table from an earlier run that matches the current schema
#[derive(Debug, Clone)]
pub struct PreviousOutput {
    units: HashSet<String>,
    table: Table,
}

impl PreviousOutput {
    /// Load the final table and its manifest if both exist and match `columns`
    pub fn load(output: &Path, manifest: &Path, columns: &[String]) -> WfxResult<Option<Self>> {
        let Some(manifest) = read_manifest(manifest)? else {
            return Ok(None);
        };
        if manifest.columns != columns {
            info!("previous output was written with different columns; ignoring it");
            return Ok(None);
        }
        if !output.exists() {
            debug!(path = %output.display(), "manifest present but final table missing");
            return Ok(None);
        }
        let table = read_table(output)?;
        if table.columns != columns {
            warn!(path = %output.display(), "final table header disagrees with its manifest; ignoring it");
            return Ok(None);
        }
        Ok(Some(Self { units: manifest.units.into_iter().collect(), table }))
    }

    pub fn contains(&self, unit: &UnitId) -> bool {
        self.units.contains(unit.as_str())
    }

    /// Rendered rows previously merged for `unit`
    pub fn rows_for<'a>(&'a self, unit: &'a UnitId) -> impl Iterator<Item = &'a Vec<String>> + 'a {
        self.table.rows_for(unit.as_str())
    }
}

/// Resume decision for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumePlan {
    /// Units to process, in requested order
    pub remaining: Vec<UnitId>,
    /// Units already done, in requested order
    pub skipped: Vec<UnitId>,
}

/// Decides which requested units still need processing
pub struct ResumePlanner<'a> {
    partial_dir: &'a Path,
    force: bool,
    previous: Option<&'a PreviousOutput>,
}

impl<'a> ResumePlanner<'a> {
    pub fn new(partial_dir: &'a Path, force: bool, previous: Option<&'a PreviousOutput>) -> Self {
        Self { partial_dir, force, previous }
    }

    pub fn for_context(ctx: &'a RunContext, previous: Option<&'a PreviousOutput>) -> Self {
        Self::new(ctx.partial_dir(), ctx.force(), previous)
    }

    /// A unit is done when its partial artifact exists or the previous
    /// output already holds its rows
    pub fn is_done(&self, unit: &UnitId) -> bool {
        partial_file(self.partial_dir, unit).is_file()
            || self.previous.is_some_and(|p| p.contains(unit))
    }

    pub fn plan(&self, requested: &[UnitId]) -> ResumePlan {
        if self.force {
            return ResumePlan { remaining: requested.to_vec(), skipped: Vec::new() };
        }

        let (skipped, remaining): (Vec<UnitId>, Vec<UnitId>) =
            requested.iter().cloned().partition(|unit| self.is_done(unit));
        if !skipped.is_empty() {
            info!(done = skipped.len(), remaining = remaining.len(), "resuming earlier run");
        }
        ResumePlan { remaining, skipped }
    }
}

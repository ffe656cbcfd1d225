//! Run summary

use crate::merge::MergeSummary;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};
use wfx_core::{UnitId, UnitOutcome, UnitStatus};

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output: PathBuf,
    pub requested: usize,
    /// Units already done before this run started
    pub resumed: Vec<UnitId>,
    /// Outcome of every unit dispatched in this run, in requested order
    pub outcomes: Vec<(UnitId, UnitOutcome)>,
    pub merge: MergeSummary,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.count(UnitStatus::Done)
    }

    /// Units that never started, e.g. for lack of a recording
    pub fn skipped(&self) -> usize {
        self.count(UnitStatus::NotStarted)
    }

    pub fn failed(&self) -> usize {
        self.count(UnitStatus::Failed)
    }

    pub fn missing(&self) -> &[UnitId] {
        &self.merge.missing
    }

    /// True when every requested unit made it into the final table
    pub fn is_complete(&self) -> bool {
        self.merge.missing.is_empty()
    }

    pub fn outcome(&self, unit: &UnitId) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|(u, _)| u == unit).map(|(_, o)| o)
    }

    fn count(&self, status: UnitStatus) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.status() == status).count()
    }

    /// Emit the summary through tracing
    pub fn log(&self) {
        info!(
            requested = self.requested,
            processed = self.processed(),
            skipped = self.skipped(),
            failed = self.failed(),
            resumed = self.resumed.len(),
            rows = self.merge.rows,
            "run finished"
        );
        for (unit, outcome) in &self.outcomes {
            if outcome.status() != UnitStatus::Done {
                warn!(unit = %unit, "{}", outcome);
            }
        }
        if !self.is_complete() {
            warn!(missing = ?self.missing_ids(), "units absent from the final table");
        }
    }

    fn missing_ids(&self) -> Vec<&str> {
        self.merge.missing.iter().map(UnitId::as_str).collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Output: {}", self.output.display())?;
        writeln!(
            f,
            "Units: {} requested, {} processed, {} skipped, {} failed, {} resumed",
            self.requested,
            self.processed(),
            self.skipped(),
            self.failed(),
            self.resumed.len()
        )?;
        writeln!(f, "Rows: {}", self.merge.rows)?;
        if self.is_complete() {
            write!(f, "Missing: none")
        } else {
            write!(f, "Missing: {}", self.missing_ids().join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    #[test]
    fn test_counts_and_display() {
        let report = RunReport {
            output: PathBuf::from("out.csv"),
            requested: 4,
            resumed: vec![id("P01")],
            outcomes: vec![
                (id("P02"), UnitOutcome::Processed { rows: 2 }),
                (id("P03"), UnitOutcome::Skipped { reason: "no recording".into() }),
                (id("P04"), UnitOutcome::Failed { cause: "boom".into() }),
            ],
            merge: MergeSummary {
                merged: vec![id("P01"), id("P02")],
                carried: vec![],
                missing: vec![id("P03"), id("P04")],
                rows: 4,
            },
        };
        assert_eq!((report.processed(), report.skipped(), report.failed()), (1, 1, 1));
        assert!(!report.is_complete());
        assert_eq!(report.outcome(&id("P04")), Some(&UnitOutcome::Failed { cause: "boom".into() }));
        assert!(report.outcome(&id("P01")).is_none());

        let text = report.to_string();
        assert!(text.contains("4 requested, 1 processed, 1 skipped, 1 failed, 1 resumed"));
        assert!(text.ends_with("Missing: P03, P04"));
    }
}

//! Sample-index windows over a recording

use serde::{Deserialize, Serialize};

/// A half-open sample range `[start, end)` belonging to one condition
///
/// Planner output always satisfies `start < end <= n_samples`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    /// Exclusive end sample
    pub end: usize,
    /// Canonical condition this window belongs to
    pub condition: String,
    /// Position of the window within its condition, counted from zero
    pub index: usize,
}

impl Window {
    pub fn new(start: usize, end: usize, condition: impl Into<String>, index: usize) -> Self {
        Self { start, end, condition: condition.into(), index }
    }

    /// Number of samples covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the window covers no samples after clamping
    pub fn is_degenerate(&self) -> bool {
        self.end <= self.start
    }
}

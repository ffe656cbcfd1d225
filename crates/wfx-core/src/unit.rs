//! Units of work: one independent recording/participant each

use crate::config_error;
use crate::error::WfxResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a unit, also used to name its partial-result artifact
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Create an identifier, rejecting values that cannot name a file
    pub fn new(id: impl Into<String>) -> WfxResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(config_error!("unit identifier must not be empty"));
        }
        if trimmed.contains(['/', '\\', ':']) || trimmed == "." || trimmed == ".." {
            return Err(config_error!("unit identifier '{}' is not a valid file name", id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing status of a unit as observed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    NotStarted,
    Done,
    Failed,
}

/// Result of running one unit through the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitOutcome {
    /// Partial result written with this many rows
    Processed { rows: usize },
    /// Unit could not start (e.g. recording missing); not a failure
    Skipped { reason: String },
    /// Processing started but did not complete
    Failed { cause: String },
}

impl UnitOutcome {
    pub fn status(&self) -> UnitStatus {
        match self {
            UnitOutcome::Processed { .. } => UnitStatus::Done,
            UnitOutcome::Skipped { .. } => UnitStatus::NotStarted,
            UnitOutcome::Failed { .. } => UnitStatus::Failed,
        }
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOutcome::Processed { rows } => write!(f, "processed ({} rows)", rows),
            UnitOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            UnitOutcome::Failed { cause } => write!(f, "failed: {}", cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_validation() {
        assert_eq!(UnitId::new(" P01 ").unwrap().as_str(), "P01");
        assert!(UnitId::new("").is_err());
        assert!(UnitId::new("   ").is_err());
        assert!(UnitId::new("../P01").is_err());
        assert!(UnitId::new("a\\b").is_err());
        assert!(UnitId::new("..").is_err());
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(UnitOutcome::Processed { rows: 0 }.status(), UnitStatus::Done);
        assert_eq!(
            UnitOutcome::Skipped { reason: "missing".into() }.status(),
            UnitStatus::NotStarted
        );
        assert_eq!(
            UnitOutcome::Failed { cause: "boom".into() }.status(),
            UnitStatus::Failed
        );
        assert_eq!(UnitOutcome::Processed { rows: 3 }.to_string(), "processed (3 rows)");
    }
}

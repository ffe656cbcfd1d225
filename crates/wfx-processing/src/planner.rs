//! Condition/window planning
//!
//! Turns a recording's raw event markers into canonical condition windows.
//! Everything here works on sample indices only, so plans can be built and
//! tested without touching signal data.

use crate::config::{ConditionDef, CorrectionMode, ValidatedConfig, WindowMode};
use std::collections::HashSet;
use std::fmt;
use wfx_core::{Event, Window};

/// Map a raw event label to a canonical condition
///
/// A label matches when it equals the condition name or contains one of its
/// aliases, both case-insensitively. The first matching condition wins.
pub fn match_condition(label: &str, conditions: &[ConditionDef]) -> Option<usize> {
    let label = label.trim().to_lowercase();
    conditions.iter().position(|condition| {
        label == condition.name.to_lowercase()
            || condition
                .aliases
                .iter()
                .any(|alias| label.contains(&alias.trim().to_lowercase()))
    })
}

/// Rolling window length and step in samples
///
/// The step is never smaller than one sample.
pub fn rolling_geometry(window_secs: f64, overlap: f64, sample_rate: f64) -> (usize, usize) {
    let length = (window_secs * sample_rate).round().max(1.0) as usize;
    let step = ((length as f64) * (1.0 - overlap)).round().max(1.0) as usize;
    (length, step)
}

/// Number of samples covered by `secs` seconds
pub fn samples_for(secs: f64, sample_rate: f64) -> usize {
    (secs * sample_rate).round().max(0.0) as usize
}

/// Why an event, window or condition produced no rows
#[derive(Debug, Clone, PartialEq)]
pub enum PlanSkip {
    /// Raw label matched no condition
    Unmapped { label: String, onset: usize },
    /// Condition already seen and only the first occurrence is used
    Duplicate { condition: String, onset: usize },
    /// Window empty after clamping to the recording
    Degenerate { condition: String, start: usize, end: usize },
    /// Condition span shorter than one rolling window
    TooShort { condition: String, onset: usize, span: usize, window_len: usize },
    /// No usable baseline occurrence before the condition onset
    MissingBaseline { condition: String, reference: String, onset: usize },
}

impl PlanSkip {
    /// Skips that deserve a warning; the rest are informational
    pub fn is_warning(&self) -> bool {
        !matches!(self, PlanSkip::Unmapped { .. } | PlanSkip::Duplicate { .. })
    }
}

impl fmt::Display for PlanSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSkip::Unmapped { label, onset } => {
                write!(f, "event '{}' at sample {} matches no condition", label, onset)
            }
            PlanSkip::Duplicate { condition, onset } => {
                write!(f, "repeat of condition '{}' at sample {} ignored", condition, onset)
            }
            PlanSkip::Degenerate { condition, start, end } => write!(
                f,
                "degenerate window [{}, {}) for condition '{}'",
                start, end, condition
            ),
            PlanSkip::TooShort { condition, onset, span, window_len } => write!(
                f,
                "condition '{}' at sample {} spans {} samples, shorter than one {}-sample window",
                condition, onset, span, window_len
            ),
            PlanSkip::MissingBaseline { condition, reference, onset } => write!(
                f,
                "no '{}' baseline before condition '{}' at sample {}",
                reference, condition, onset
            ),
        }
    }
}

/// Baseline windows matched to a condition occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct BaselinePlan {
    pub condition: String,
    pub onset: usize,
    pub windows: Vec<Window>,
}

/// One retained condition occurrence and its windows
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCondition {
    pub condition: String,
    pub onset: usize,
    pub windows: Vec<Window>,
    /// Present only for delta-corrected conditions
    pub baseline: Option<BaselinePlan>,
}

/// Planner output for one recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub conditions: Vec<PlannedCondition>,
    pub skips: Vec<PlanSkip>,
}

impl Plan {
    pub fn window_count(&self) -> usize {
        self.conditions.iter().map(|c| c.windows.len()).sum()
    }
}

/// Plans windows for recordings under one validated configuration
pub struct WindowPlanner<'a> {
    config: &'a ValidatedConfig,
}

impl<'a> WindowPlanner<'a> {
    pub fn new(config: &'a ValidatedConfig) -> Self {
        Self { config }
    }

    /// Plan all windows for a recording's events
    ///
    /// Conditions are emitted in event order; windows within a condition in
    /// ascending sample order.
    pub fn plan(&self, events: &[Event], sample_rate: f64, n_samples: usize) -> Plan {
        let conditions = self.config.conditions();
        let windowing = self.config.windowing();
        let delta = self.config.correction().mode == CorrectionMode::Delta;

        let mapped: Vec<Option<usize>> =
            events.iter().map(|e| match_condition(&e.label, conditions)).collect();

        let mut plan = Plan::default();
        let mut seen = HashSet::new();
        let mut next_index = vec![0usize; conditions.len()];

        for (event, mapping) in events.iter().zip(&mapped) {
            let Some(ci) = *mapping else {
                plan.skips.push(PlanSkip::Unmapped {
                    label: event.label.clone(),
                    onset: event.onset,
                });
                continue;
            };
            let condition = &conditions[ci];

            if windowing.first_occurrence_only && !seen.insert(ci) {
                plan.skips.push(PlanSkip::Duplicate {
                    condition: condition.name.clone(),
                    onset: event.onset,
                });
                continue;
            }

            let baseline = match (&condition.reference, delta) {
                (Some(reference), true) => {
                    match self.locate_baseline(reference, event.onset, events, &mapped, sample_rate, n_samples) {
                        Some(baseline) => Some(baseline),
                        None => {
                            plan.skips.push(PlanSkip::MissingBaseline {
                                condition: condition.name.clone(),
                                reference: reference.clone(),
                                onset: event.onset,
                            });
                            continue;
                        }
                    }
                }
                _ => None,
            };

            let span = samples_for(condition.duration_secs, sample_rate);
            let windows = match self.windows_for(
                &condition.name,
                event.onset,
                span,
                sample_rate,
                n_samples,
                next_index[ci],
            ) {
                Ok(windows) => windows,
                Err(skip) => {
                    plan.skips.push(skip);
                    continue;
                }
            };

            next_index[ci] += windows.len();
            plan.conditions.push(PlannedCondition {
                condition: condition.name.clone(),
                onset: event.onset,
                windows,
                baseline,
            });
        }

        plan
    }

    /// Windows over `[onset, onset + span)` clamped to the recording
    fn windows_for(
        &self,
        condition: &str,
        onset: usize,
        span: usize,
        sample_rate: f64,
        n_samples: usize,
        first_index: usize,
    ) -> Result<Vec<Window>, PlanSkip> {
        let end = onset.saturating_add(span).min(n_samples);
        let start = onset.min(n_samples);
        let full = Window::new(start, end, condition, first_index);
        if full.is_degenerate() {
            return Err(PlanSkip::Degenerate { condition: condition.to_string(), start, end });
        }

        let windowing = self.config.windowing();
        match windowing.mode {
            WindowMode::Full => Ok(vec![full]),
            WindowMode::Rolling => {
                let (length, step) =
                    rolling_geometry(windowing.window_secs, windowing.overlap, sample_rate);
                let windows: Vec<Window> = (0..)
                    .map(|k| start + k * step)
                    .take_while(|s| s + length <= end)
                    .enumerate()
                    .map(|(k, s)| Window::new(s, s + length, condition, first_index + k))
                    .collect();
                if windows.is_empty() {
                    return Err(PlanSkip::TooShort {
                        condition: condition.to_string(),
                        onset,
                        span: end - start,
                        window_len: length,
                    });
                }
                Ok(windows)
            }
        }
    }

    /// Most recent reference occurrence strictly before `onset`
    fn locate_baseline(
        &self,
        reference: &str,
        onset: usize,
        events: &[Event],
        mapped: &[Option<usize>],
        sample_rate: f64,
        n_samples: usize,
    ) -> Option<BaselinePlan> {
        let reference_index = self.config.config().condition(reference)?;
        let baseline_onset = events
            .iter()
            .zip(mapped)
            .filter(|(e, m)| **m == Some(reference_index) && e.onset < onset)
            .map(|(e, _)| e.onset)
            .max()?;

        let span = samples_for(self.config.correction().reference_duration_secs, sample_rate);
        let windows = self
            .windows_for(reference, baseline_onset, span, sample_rate, n_samples, 0)
            .ok()?;

        Some(BaselinePlan { condition: reference.to_string(), onset: baseline_onset, windows })
    }
}

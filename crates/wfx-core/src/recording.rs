//! Recording: core container for one unit's multi-channel signal

use crate::error::WfxResult;
use crate::recording_error;
use crate::window::Window;
use ndarray::{Array2, ArrayView2, s};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Event marker as delivered by the upstream loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Raw label, before mapping to a canonical condition
    pub label: String,
    /// Onset as a sample index into the recording
    pub onset: usize,
}

impl Event {
    pub fn new(label: impl Into<String>, onset: usize) -> Self {
        Self { label: label.into(), onset }
    }
}

/// A complete, already-materialized recording
///
/// `data` is channel-major: row `i` holds the samples of `channel_labels[i]`.
#[derive(Debug, Clone)]
pub struct Recording {
    channel_labels: Vec<String>,
    sample_rate: f64,
    data: Array2<f64>,
    events: Vec<Event>,
}

impl Recording {
    /// Create a recording, validating shape and labels
    ///
    /// Events are kept in the order given, including any whose onset lies past
    /// the last sample. The planner clamps and skips those.
    pub fn new(
        channel_labels: Vec<String>,
        sample_rate: f64,
        data: Array2<f64>,
        events: Vec<Event>,
    ) -> WfxResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(recording_error!("sample rate must be positive, got {}", sample_rate));
        }

        let (n_channels, n_samples) = data.dim();
        if n_channels == 0 || n_samples == 0 {
            return Err(recording_error!(
                "recording is empty ({} channels x {} samples)",
                n_channels,
                n_samples
            ));
        }

        if channel_labels.len() != n_channels {
            return Err(recording_error!(
                "{} channel labels for {} data rows",
                channel_labels.len(),
                n_channels
            ));
        }

        let mut seen = HashSet::with_capacity(n_channels);
        for label in &channel_labels {
            if !seen.insert(label.trim().to_lowercase()) {
                return Err(recording_error!("duplicate channel label '{}'", label));
            }
        }

        Ok(Self { channel_labels, sample_rate, data, events })
    }

    pub fn channel_labels(&self) -> &[String] {
        &self.channel_labels
    }

    /// Sampling rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn channel_count(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples per channel
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Channel×sample view of a window
    pub fn block(&self, window: &Window) -> ArrayView2<'_, f64> {
        let end = window.end.min(self.n_samples());
        let start = window.start.min(end);
        self.data.slice(s![.., start..end])
    }

    /// Convert a sample index to seconds from recording start
    pub fn seconds_at(&self, sample: usize) -> f64 {
        sample as f64 / self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recording_creation() {
        let data = Array2::from_shape_fn((2, 500), |(c, t)| (c * 1000 + t) as f64);
        let rec = Recording::new(
            labels(&["Fz", "Cz"]),
            250.0,
            data,
            vec![Event::new("Baseline", 0), Event::new("Task", 250)],
        )
        .unwrap();

        assert_eq!(rec.channel_count(), 2);
        assert_eq!(rec.n_samples(), 500);
        assert!((rec.duration() - 2.0).abs() < 1e-12);
        assert_eq!(rec.events().len(), 2);
        assert!((rec.seconds_at(125) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_block_view() {
        let data = Array2::from_shape_fn((2, 100), |(c, t)| (c * 1000 + t) as f64);
        let rec = Recording::new(labels(&["Fz", "Cz"]), 100.0, data, vec![]).unwrap();

        let block = rec.block(&Window::new(10, 20, "Task", 0));
        assert_eq!(block.dim(), (2, 10));
        assert_eq!(block[[0, 0]], 10.0);
        assert_eq!(block[[1, 9]], 1019.0);
    }

    #[test]
    fn test_rejects_inconsistent_input() {
        let data = Array2::<f64>::zeros((2, 100));
        assert!(Recording::new(labels(&["Fz"]), 100.0, data.clone(), vec![]).is_err());
        assert!(Recording::new(labels(&["Fz", " fz"]), 100.0, data.clone(), vec![]).is_err());
        assert!(Recording::new(labels(&["Fz", "Cz"]), 0.0, data.clone(), vec![]).is_err());
        assert!(Recording::new(labels(&[]), 100.0, Array2::zeros((0, 0)), vec![]).is_err());
    }

    #[test]
    fn test_keeps_events_past_the_end() {
        let data = Array2::<f64>::zeros((1, 100));
        let rec = Recording::new(
            labels(&["Fz"]),
            100.0,
            data,
            vec![Event::new("Task", 10), Event::new("end marker", 100_000)],
        )
        .unwrap();
        assert_eq!(rec.events()[1].onset, 100_000);
        assert_eq!(rec.block(&Window::new(100_000, 100_500, "Task", 0)).dim(), (1, 0));
    }
}

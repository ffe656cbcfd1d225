//! Synthetic multi-channel recordings with condition events

use crate::signal_patterns::SignalPattern;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use wfx_core::{Event, Recording, WfxError, WfxResult};

/// Standard 10-20 montage used by default
pub const TEN_TWENTY_MONTAGE: [&str; 19] = [
    "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
    "P4", "P8", "O1", "O2",
];

/// A stretch of the recording with one event marker at its start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSegment {
    /// Event label emitted at the segment onset; `None` for unlabelled gaps
    pub label: Option<String>,
    pub duration_secs: f64,
    pub pattern: SignalPattern,
}

impl SimulatedSegment {
    /// Segment whose pattern follows from its label
    pub fn labelled(label: &str, duration_secs: f64) -> Self {
        Self {
            label: Some(label.to_string()),
            duration_secs,
            pattern: SignalPattern::for_label(label),
        }
    }

    pub fn gap(duration_secs: f64) -> Self {
        Self { label: None, duration_secs, pattern: SignalPattern::Silent }
    }
}

/// Configuration for recording simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub sample_rate: f64,
    pub channel_labels: Vec<String>,
    pub segments: Vec<SimulatedSegment>,
    /// Gaussian noise standard deviation in microvolts
    pub noise_std: f64,
    /// Power line interference (50/60Hz)
    pub powerline_freq: Option<f64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 125.0,
            channel_labels: TEN_TWENTY_MONTAGE.iter().map(|c| c.to_string()).collect(),
            segments: vec![
                SimulatedSegment::gap(2.0),
                SimulatedSegment::labelled("Forest_Baseline", 60.0),
                SimulatedSegment::labelled("Stress_Arithmetic", 60.0),
            ],
            noise_std: 5.0,
            powerline_freq: Some(50.0),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Short recording for tests and smoke runs
    pub fn short(seed: u64) -> Self {
        Self {
            channel_labels: ["F3", "F4", "Fz", "O1", "O2"].iter().map(|c| c.to_string()).collect(),
            segments: vec![
                SimulatedSegment::labelled("Forest_Baseline", 20.0),
                SimulatedSegment::labelled("Stress_Arithmetic", 20.0),
            ],
            seed: Some(seed),
            ..Self::default()
        }
    }

    fn validate(&self) -> WfxResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(WfxError::InvalidConfig {
                message: format!("simulation sample rate must be positive, got {}", self.sample_rate),
            });
        }
        if self.channel_labels.is_empty() {
            return Err(WfxError::InvalidConfig {
                message: "simulation needs at least one channel".to_string(),
            });
        }
        if self.segments.iter().any(|s| !(s.duration_secs.is_finite() && s.duration_secs > 0.0)) {
            return Err(WfxError::InvalidConfig {
                message: "simulated segment durations must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Recording simulator
pub struct RecordingSimulator {
    config: SimulationConfig,
    rng: StdRng,
    noise: Normal<f64>,
}

impl RecordingSimulator {
    pub fn new(config: SimulationConfig) -> WfxResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| WfxError::InvalidConfig {
            message: format!("Failed to create normal distribution: {}", e),
        })?;

        Ok(Self { config, rng, noise })
    }

    /// Generate the full recording with one event per labelled segment
    pub fn generate(&mut self) -> WfxResult<Recording> {
        let fs = self.config.sample_rate;
        let n_channels = self.config.channel_labels.len();

        let mut bounds = Vec::with_capacity(self.config.segments.len());
        let mut cursor = 0usize;
        for segment in &self.config.segments {
            let len = (segment.duration_secs * fs).round() as usize;
            bounds.push((cursor, cursor + len));
            cursor += len;
        }
        let n_samples = cursor;

        // Per-channel gain and phase keep channels correlated but distinct.
        let gains: Vec<f64> = (0..n_channels).map(|_| self.rng.gen_range(0.8..1.2)).collect();
        let phases: Vec<f64> = (0..n_channels).map(|_| self.rng.gen_range(0.0..2.0 * PI)).collect();

        let mut data = Array2::<f64>::zeros((n_channels, n_samples));
        let mut events = Vec::new();
        for (segment, &(start, end)) in self.config.segments.iter().zip(&bounds) {
            if let Some(label) = &segment.label {
                if start < n_samples {
                    events.push(Event::new(label.clone(), start));
                }
            }
            let rhythms = segment.pattern.rhythms();
            for t in start..end {
                let time = t as f64 / fs;
                for c in 0..n_channels {
                    let mut value: f64 = rhythms
                        .iter()
                        .map(|r| r.value_at_time(time, phases[c]))
                        .sum::<f64>()
                        * gains[c];
                    value += self.noise.sample(&mut self.rng);
                    if let Some(line) = self.config.powerline_freq {
                        value += 0.5 * (2.0 * PI * line * time).sin();
                    }
                    data[[c, t]] = value;
                }
            }
        }

        Recording::new(self.config.channel_labels.clone(), fs, data, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_short_recording() {
        let mut sim = RecordingSimulator::new(SimulationConfig::short(7)).unwrap();
        let rec = sim.generate().unwrap();
        assert_eq!(rec.channel_count(), 5);
        assert_eq!(rec.n_samples(), 5000);
        let onsets: Vec<usize> = rec.events().iter().map(|e| e.onset).collect();
        assert_eq!(onsets, vec![0, 2500]);
        assert_eq!(rec.events()[1].label, "Stress_Arithmetic");
    }

    #[test]
    fn test_seed_reproducibility() {
        let a = RecordingSimulator::new(SimulationConfig::short(42)).unwrap().generate().unwrap();
        let b = RecordingSimulator::new(SimulationConfig::short(42)).unwrap().generate().unwrap();
        let c = RecordingSimulator::new(SimulationConfig::short(43)).unwrap().generate().unwrap();
        assert_eq!(a.data(), b.data());
        assert_ne!(a.data(), c.data());
    }

    #[test]
    fn test_gaps_carry_no_event() {
        let config = SimulationConfig {
            segments: vec![SimulatedSegment::gap(1.0), SimulatedSegment::labelled("rest", 1.0)],
            ..SimulationConfig::short(1)
        };
        let rec = RecordingSimulator::new(config).unwrap().generate().unwrap();
        assert_eq!(rec.events().len(), 1);
        assert_eq!(rec.events()[0].onset, 125);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SimulationConfig::short(1);
        config.sample_rate = 0.0;
        assert!(RecordingSimulator::new(config).is_err());

        let mut config = SimulationConfig::short(1);
        config.channel_labels.clear();
        assert!(RecordingSimulator::new(config).is_err());
    }
}

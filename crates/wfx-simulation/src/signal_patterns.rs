//! Pre-defined EEG rhythm patterns for synthetic recordings

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One oscillatory component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rhythm {
    /// Centre frequency in Hz
    pub frequency: f64,
    /// Peak amplitude in microvolts
    pub amplitude: f64,
}

impl Rhythm {
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        Self { frequency, amplitude }
    }

    /// Value at `time` seconds with a phase offset in radians
    pub fn value_at_time(&self, time: f64, phase: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * time + phase).sin()
    }
}

/// Mixture of rhythms describing one experimental state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalPattern {
    /// Eyes-closed rest: dominant alpha
    Relaxed,
    /// Mental arithmetic: frontal theta and beta, suppressed alpha
    Engaged,
    /// Flat activity, noise only
    Silent,
    /// Explicit rhythm mixture
    Custom { rhythms: Vec<Rhythm> },
}

impl SignalPattern {
    /// Rhythm components of the pattern
    pub fn rhythms(&self) -> Vec<Rhythm> {
        match self {
            SignalPattern::Relaxed => vec![
                Rhythm::new(2.5, 6.0),
                Rhythm::new(6.0, 4.0),
                Rhythm::new(10.0, 20.0),
                Rhythm::new(20.0, 3.0),
            ],
            SignalPattern::Engaged => vec![
                Rhythm::new(2.5, 6.0),
                Rhythm::new(6.0, 12.0),
                Rhythm::new(10.0, 6.0),
                Rhythm::new(20.0, 9.0),
                Rhythm::new(38.0, 2.0),
            ],
            SignalPattern::Silent => Vec::new(),
            SignalPattern::Custom { rhythms } => rhythms.clone(),
        }
    }

    /// Pattern implied by an event label
    pub fn for_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if ["stress", "arithmetic", "task"].iter().any(|k| label.contains(k)) {
            SignalPattern::Engaged
        } else if ["forest", "rest", "baseline"].iter().any(|k| label.contains(k)) {
            SignalPattern::Relaxed
        } else {
            SignalPattern::Silent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rhythm_value() {
        let r = Rhythm::new(1.0, 2.0);
        assert!(r.value_at_time(0.0, 0.0).abs() < 1e-12);
        assert!((r.value_at_time(0.25, 0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pattern_from_label() {
        assert_eq!(SignalPattern::for_label("Forest_Start"), SignalPattern::Relaxed);
        assert_eq!(SignalPattern::for_label("HighStress"), SignalPattern::Engaged);
        assert_eq!(SignalPattern::for_label("boundary"), SignalPattern::Silent);
        assert!(SignalPattern::Silent.rhythms().is_empty());
    }

    #[test]
    fn test_relaxed_is_alpha_dominant() {
        let alpha = |p: &SignalPattern| {
            p.rhythms()
                .iter()
                .filter(|r| (8.0..13.0).contains(&r.frequency))
                .map(|r| r.amplitude)
                .sum::<f64>()
        };
        assert!(alpha(&SignalPattern::Relaxed) > alpha(&SignalPattern::Engaged));
    }
}

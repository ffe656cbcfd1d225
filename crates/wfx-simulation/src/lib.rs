//! WFX-Simulation: synthetic EEG recordings
//!
//! Generates seeded multi-channel recordings with condition events for
//! tests, demos and smoke runs.

pub mod recording_simulator;
pub mod signal_patterns;

pub use recording_simulator::*;
pub use signal_patterns::*;

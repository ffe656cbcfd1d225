//! Signal window extractor
//!
//! Computes one [`FeatureVector`] per window in schema column order. The
//! spectrum is estimated once per window and shared by band power, ratios and
//! spectral entropy.

use crate::config::{EntropyMetric, ValidatedConfig};
use crate::features::{
    band_power, channel_mask, global_std, region_sample_entropy, spectral_entropy, FeatureVector,
    SAMPLE_ENTROPY_R_FACTOR,
};
use crate::schema::FeatureKey;
use crate::spectral::{Spectrum, WelchEstimator};
use ndarray::{Array2, ArrayView2};
use tracing::debug;
use wfx_core::{WfxError, WfxResult};

/// Per-region channel indices resolved against one recording's labels
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMasks {
    masks: Vec<Vec<usize>>,
}

impl ChannelMasks {
    pub fn resolve(config: &ValidatedConfig, labels: &[String]) -> Self {
        let masks = config
            .regions()
            .iter()
            .map(|region| channel_mask(&region.channels, labels))
            .collect();
        Self { masks }
    }

    pub fn region(&self, region: usize) -> &[usize] {
        self.masks.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Regions with no channel present in the recording
    pub fn empty_regions(&self) -> impl Iterator<Item = usize> + '_ {
        self.masks.iter().enumerate().filter(|(_, m)| m.is_empty()).map(|(i, _)| i)
    }
}

/// Extracts feature vectors for windows of one recording
pub struct WindowExtractor<'a> {
    config: &'a ValidatedConfig,
    masks: ChannelMasks,
    estimator: WelchEstimator,
}

impl<'a> WindowExtractor<'a> {
    pub fn new(config: &'a ValidatedConfig, labels: &[String]) -> Self {
        let masks = ChannelMasks::resolve(config, labels);
        for region in masks.empty_regions() {
            debug!(region = %config.regions()[region].name, "no channels present for region");
        }
        Self { config, masks, estimator: WelchEstimator::new() }
    }

    /// Feature vector of a channel×sample block
    pub fn extract(&mut self, block: ArrayView2<'_, f64>, sample_rate: f64) -> WfxResult<FeatureVector> {
        if block.ncols() == 0 {
            return Err(WfxError::Computation {
                reason: "cannot extract features from an empty window".to_string(),
            });
        }

        let spectrum = self.estimator.estimate(block, sample_rate)?;
        let features = self.config.features();
        let powers = if features.band_power || features.ratios {
            Some(self.band_powers(&spectrum))
        } else {
            None
        };
        let r = SAMPLE_ENTROPY_R_FACTOR * global_std(block);

        let values = self
            .config
            .schema()
            .feature_keys()
            .iter()
            .map(|key| match *key {
                FeatureKey::BandPower { region, band } => {
                    powers.as_ref().map_or(f64::NAN, |p| p[[region, band]])
                }
                FeatureKey::Ratio { ratio } => self.ratio(ratio, powers.as_ref()),
                FeatureKey::Entropy { region, metric } => {
                    let channels = self.masks.region(region);
                    match metric {
                        EntropyMetric::SpectralEntropy => spectral_entropy(&spectrum, channels),
                        EntropyMetric::SampleEntropy => region_sample_entropy(block, channels, r),
                    }
                }
            })
            .collect();

        Ok(FeatureVector(values))
    }

    /// log10 power for every (region, band) pair
    fn band_powers(&self, spectrum: &Spectrum) -> Array2<f64> {
        let regions = self.config.regions().len();
        let bands = self.config.bands();
        Array2::from_shape_fn((regions, bands.len()), |(r, b)| {
            band_power(spectrum, self.masks.region(r), bands[b].lo_hz, bands[b].hi_hz)
        })
    }

    fn ratio(&self, ratio: usize, powers: Option<&Array2<f64>>) -> f64 {
        let (Some(powers), Some(def)) = (powers, self.config.ratios().get(ratio)) else {
            return f64::NAN;
        };
        match (self.config.band_ref(&def.minuend), self.config.band_ref(&def.subtrahend)) {
            (Some(a), Some(b)) => powers[[a.0, a.1]] - powers[[b.0, b.1]],
            _ => f64::NAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BandDef, ExtractionConfig, FeatureToggles, RatioDef, RegionDef};
    use std::f64::consts::PI;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn config() -> ValidatedConfig {
        let mut config = ExtractionConfig::eeg_default();
        config.regions = vec![
            RegionDef::new("left", &["F3"]),
            RegionDef::new("right", &["F4"]),
            RegionDef::new("back", &["O1"]),
        ];
        config.bands = vec![BandDef::new("theta", 4.0, 8.0), BandDef::new("alpha", 8.0, 13.0)];
        config.ratios = vec![RatioDef::new("alpha_asym", ("right", "alpha"), ("left", "alpha"))];
        config.validate().unwrap()
    }

    /// F3 carries 10 Hz at amplitude 1, F4 at amplitude 2
    fn block(fs: f64, n: usize) -> Array2<f64> {
        Array2::from_shape_fn((2, n), |(c, t)| {
            let amplitude = (c + 1) as f64;
            let phase = 2.0 * PI * 10.0 * t as f64 / fs;
            amplitude * phase.sin() + 0.01 * ((t * 7 + c) % 13) as f64
        })
    }

    #[test]
    fn test_vector_follows_schema() {
        let cfg = config();
        let mut extractor = WindowExtractor::new(&cfg, &labels(&["F3", "F4"]));
        let fs = 125.0;
        let features = extractor.extract(block(fs, 1250).view(), fs).unwrap();
        assert_eq!(features.len(), cfg.schema().feature_count());

        let col = |name: &str| {
            let i = cfg.schema().columns().iter().position(|c| c == name).unwrap();
            features.values()[i - cfg.schema().id_columns().len()]
        };

        // Doubling the amplitude quadruples power: log10(4) difference.
        let asym = col("alpha_asym");
        assert!((asym - 4f64.log10()).abs() < 0.05, "asymmetry {}", asym);
        assert!(col("left_alpha_power") > col("left_theta_power"));

        // O1 is absent from the block.
        assert!(col("back_alpha_power").is_nan());
        assert!(col("back_spectral_entropy").is_nan());
        assert!(col("back_sample_entropy").is_nan());
        assert!(col("left_spectral_entropy").is_finite());
    }

    #[test]
    fn test_ratios_without_band_power_columns() {
        let mut raw = config().config().clone();
        raw.features = FeatureToggles { band_power: false, ratios: true, entropy: false };
        let cfg = raw.validate().unwrap();
        let mut extractor = WindowExtractor::new(&cfg, &labels(&["F3", "F4"]));
        let fs = 125.0;
        let features = extractor.extract(block(fs, 1250).view(), fs).unwrap();
        assert_eq!(features.len(), 1);
        assert!((features.values()[0] - 4f64.log10()).abs() < 0.05);
    }

    #[test]
    fn test_masks_are_case_insensitive() {
        let cfg = config();
        let masks = ChannelMasks::resolve(&cfg, &labels(&["f4", "O1 ", "F3"]));
        assert_eq!(masks.region(0), &[2]);
        assert_eq!(masks.region(1), &[0]);
        assert_eq!(masks.region(2), &[1]);
        assert_eq!(masks.empty_regions().count(), 0);
        assert!(masks.region(9).is_empty());
    }

    #[test]
    fn test_empty_window_is_error() {
        let cfg = config();
        let mut extractor = WindowExtractor::new(&cfg, &labels(&["F3", "F4"]));
        let empty = Array2::<f64>::zeros((2, 0));
        assert!(extractor.extract(empty.view(), 125.0).is_err());
    }
}

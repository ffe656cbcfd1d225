//! Output column layout
//!
//! The schema is a pure function of the configuration: the same config
//! always yields the same columns in the same order, whichever units are
//! processed and however they are scheduled.

use crate::config::{EntropyMetric, ExtractionConfig};
use std::collections::HashSet;
use wfx_core::{config_error, WfxResult};

pub const PARTICIPANT_COLUMN: &str = "Participant_ID";
pub const CONDITION_COLUMN: &str = "Condition";
pub const WINDOW_INDEX_COLUMN: &str = "Window_Index";
pub const WINDOW_START_COLUMN: &str = "Window_Start";
pub const WINDOW_END_COLUMN: &str = "Window_End";

/// One feature column, addressed by configuration indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    BandPower { region: usize, band: usize },
    Ratio { ratio: usize },
    Entropy { region: usize, metric: EntropyMetric },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    id_columns: Vec<String>,
    feature_keys: Vec<FeatureKey>,
    columns: Vec<String>,
}

impl Schema {
    /// Derive the column layout from the configuration
    pub fn build(config: &ExtractionConfig) -> WfxResult<Self> {
        let features = config.features;
        if !features.any() {
            return Err(config_error!("no feature category is enabled"));
        }

        let mut region_names = HashSet::new();
        for region in &config.regions {
            region.validate()?;
            if !region_names.insert(region.name.as_str()) {
                return Err(config_error!("duplicate region '{}'", region.name));
            }
        }
        let mut band_names = HashSet::new();
        for band in &config.bands {
            band.validate()?;
            if !band_names.insert(band.name.as_str()) {
                return Err(config_error!("duplicate band '{}'", band.name));
            }
        }

        if (features.band_power || features.entropy) && config.regions.is_empty() {
            return Err(config_error!("enabled features require at least one region"));
        }
        if features.band_power && config.bands.is_empty() {
            return Err(config_error!("band power is enabled but no bands are defined"));
        }
        if features.ratios && config.ratios.is_empty() {
            return Err(config_error!("ratios are enabled but no ratios are defined"));
        }
        if features.entropy && config.entropy_metrics.is_empty() {
            return Err(config_error!("entropy is enabled but no entropy metrics are listed"));
        }

        let mut id_columns = vec![PARTICIPANT_COLUMN.to_string(), CONDITION_COLUMN.to_string()];
        if config.windowing.is_rolling() {
            id_columns.extend(
                [WINDOW_INDEX_COLUMN, WINDOW_START_COLUMN, WINDOW_END_COLUMN]
                    .iter()
                    .map(|c| c.to_string()),
            );
        }

        let mut feature_keys = Vec::new();
        let mut feature_columns = Vec::new();

        if features.band_power {
            for (r, region) in config.regions.iter().enumerate() {
                for (b, band) in config.bands.iter().enumerate() {
                    feature_keys.push(FeatureKey::BandPower { region: r, band: b });
                    feature_columns.push(format!("{}_{}_power", region.name, band.name));
                }
            }
        }

        if features.ratios {
            for (i, ratio) in config.ratios.iter().enumerate() {
                feature_keys.push(FeatureKey::Ratio { ratio: i });
                feature_columns.push(ratio.name.clone());
            }
        }

        if features.entropy {
            let mut seen_metrics = HashSet::new();
            let metrics: Vec<EntropyMetric> = config
                .entropy_metrics
                .iter()
                .copied()
                .filter(|m| seen_metrics.insert(*m))
                .collect();
            for (r, region) in config.regions.iter().enumerate() {
                for metric in &metrics {
                    feature_keys.push(FeatureKey::Entropy { region: r, metric: *metric });
                    feature_columns.push(format!("{}_{}", region.name, metric.as_str()));
                }
            }
        }

        let mut columns = id_columns.clone();
        columns.extend(feature_columns);

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(config_error!("column '{}' would appear twice in the output", column));
            }
        }

        Ok(Self { id_columns, feature_keys, columns })
    }

    /// Every column name, identifiers first
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    /// Feature keys in column order
    pub fn feature_keys(&self) -> &[FeatureKey] {
        &self.feature_keys
    }

    pub fn feature_count(&self) -> usize {
        self.feature_keys.len()
    }

    pub fn has_window_columns(&self) -> bool {
        self.id_columns.len() > 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BandDef, FeatureToggles, RegionDef, WindowingConfig};

    fn small_config() -> ExtractionConfig {
        let mut config = ExtractionConfig::eeg_default();
        config.regions = vec![
            RegionDef::new("frontal", &["Fz"]),
            RegionDef::new("occipital", &["O1", "O2"]),
        ];
        config.bands = vec![BandDef::new("theta", 4.0, 8.0), BandDef::new("alpha", 8.0, 12.0)];
        config.ratios = vec![crate::config::RatioDef::new(
            "fo_alpha",
            ("frontal", "alpha"),
            ("occipital", "alpha"),
        )];
        config
    }

    #[test]
    fn test_column_order() {
        let schema = Schema::build(&small_config()).unwrap();
        let expected = vec![
            "Participant_ID",
            "Condition",
            "frontal_theta_power",
            "frontal_alpha_power",
            "occipital_theta_power",
            "occipital_alpha_power",
            "fo_alpha",
            "frontal_spectral_entropy",
            "frontal_sample_entropy",
            "occipital_spectral_entropy",
            "occipital_sample_entropy",
        ];
        assert_eq!(schema.columns(), expected.as_slice());
        assert_eq!(schema.feature_count(), 9);
        assert!(!schema.has_window_columns());
    }

    #[test]
    fn test_deterministic() {
        let config = small_config();
        let first = Schema::build(&config).unwrap();
        for _ in 0..5 {
            assert_eq!(Schema::build(&config).unwrap(), first);
        }
    }

    #[test]
    fn test_rolling_adds_window_columns() {
        let mut config = small_config();
        config.windowing = WindowingConfig::rolling(10.0, 0.5);
        let schema = Schema::build(&config).unwrap();
        assert_eq!(
            &schema.columns()[..5],
            &["Participant_ID", "Condition", "Window_Index", "Window_Start", "Window_End"]
        );
        assert!(schema.has_window_columns());
    }

    #[test]
    fn test_category_toggles() {
        let mut config = small_config();
        config.features = FeatureToggles { band_power: false, ratios: true, entropy: false };
        let schema = Schema::build(&config).unwrap();
        assert_eq!(schema.columns(), &["Participant_ID", "Condition", "fo_alpha"]);

        config.features = FeatureToggles { band_power: false, ratios: false, entropy: false };
        assert!(Schema::build(&config).is_err());
    }

    #[test]
    fn test_rejects_column_collision() {
        let mut config = small_config();
        config.ratios[0].name = "frontal_alpha_power".to_string();
        assert!(Schema::build(&config).is_err());
    }
}

//! Configuration management for feature extraction
//!
//! [`ExtractionConfig`] is the serde-facing record read from disk. It is
//! validated exactly once into a [`ValidatedConfig`], which also carries the
//! output [`Schema`]; nothing downstream accepts an unvalidated config.

use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use wfx_core::{config_error, WfxError, WfxResult};

/// Named group of channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDef {
    pub name: String,
    pub channels: Vec<String>,
}

impl RegionDef {
    pub fn new(name: &str, channels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> WfxResult<()> {
        if self.name.trim().is_empty() {
            return Err(config_error!("region name must not be empty"));
        }
        if self.channels.iter().all(|c| c.trim().is_empty()) {
            return Err(config_error!("region '{}' has no channels", self.name));
        }
        Ok(())
    }
}

/// Named frequency interval `[lo_hz, hi_hz]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDef {
    pub name: String,
    pub lo_hz: f64,
    pub hi_hz: f64,
}

impl BandDef {
    pub fn new(name: &str, lo_hz: f64, hi_hz: f64) -> Self {
        Self { name: name.to_string(), lo_hz, hi_hz }
    }

    pub fn validate(&self) -> WfxResult<()> {
        if self.name.trim().is_empty() {
            return Err(config_error!("band name must not be empty"));
        }
        if !(self.lo_hz.is_finite() && self.hi_hz.is_finite()) || self.lo_hz < 0.0 {
            return Err(config_error!(
                "band '{}' has invalid edges [{}, {}]",
                self.name,
                self.lo_hz,
                self.hi_hz
            ));
        }
        if self.lo_hz >= self.hi_hz {
            return Err(config_error!(
                "band '{}' must satisfy lo < hi, got [{}, {}]",
                self.name,
                self.lo_hz,
                self.hi_hz
            ));
        }
        Ok(())
    }
}

/// Enabled feature categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub band_power: bool,
    pub ratios: bool,
    pub entropy: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self { band_power: true, ratios: true, entropy: true }
    }
}

impl FeatureToggles {
    pub fn any(&self) -> bool {
        self.band_power || self.ratios || self.entropy
    }
}

/// Lookup of one (region, band) log-power value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRef {
    pub region: String,
    pub band: String,
}

/// Ratio reported as `log_power(minuend) - log_power(subtrahend)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioDef {
    pub name: String,
    pub minuend: BandRef,
    pub subtrahend: BandRef,
}

impl RatioDef {
    pub fn new(name: &str, minuend: (&str, &str), subtrahend: (&str, &str)) -> Self {
        Self {
            name: name.to_string(),
            minuend: BandRef { region: minuend.0.to_string(), band: minuend.1.to_string() },
            subtrahend: BandRef {
                region: subtrahend.0.to_string(),
                band: subtrahend.1.to_string(),
            },
        }
    }
}

/// Entropy metrics computed per region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyMetric {
    SpectralEntropy,
    SampleEntropy,
}

impl EntropyMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntropyMetric::SpectralEntropy => "spectral_entropy",
            EntropyMetric::SampleEntropy => "sample_entropy",
        }
    }
}

/// Canonical condition and the raw labels that map to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Condition length in seconds, measured from the event onset
    pub duration_secs: f64,
    /// Baseline condition used for delta correction
    #[serde(default)]
    pub reference: Option<String>,
}

impl ConditionDef {
    pub fn new(name: &str, aliases: &[&str], duration_secs: f64) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            duration_secs,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// One window spanning the whole condition
    Full,
    /// Overlapping fixed-length windows inside the condition
    Rolling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowingConfig {
    pub mode: WindowMode,
    /// Rolling window length in seconds
    pub window_secs: f64,
    /// Fraction of a window shared with the next one, in `[0, 1)`
    pub overlap: f64,
    /// Ignore repeat occurrences of a condition within one recording
    pub first_occurrence_only: bool,
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            mode: WindowMode::Full,
            window_secs: 10.0,
            overlap: 0.5,
            first_occurrence_only: true,
        }
    }
}

impl WindowingConfig {
    pub fn rolling(window_secs: f64, overlap: f64) -> Self {
        Self { mode: WindowMode::Rolling, window_secs, overlap, ..Self::default() }
    }

    pub fn is_rolling(&self) -> bool {
        self.mode == WindowMode::Rolling
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMode {
    /// Report each window's features as computed
    Raw,
    /// Subtract the mean baseline feature vector
    Delta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub mode: CorrectionMode,
    /// Length of the baseline span taken from the reference onset
    pub reference_duration_secs: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self { mode: CorrectionMode::Raw, reference_duration_secs: 60.0 }
    }
}

/// Full feature-extraction configuration as read from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub regions: Vec<RegionDef>,
    pub bands: Vec<BandDef>,
    #[serde(default)]
    pub features: FeatureToggles,
    #[serde(default)]
    pub ratios: Vec<RatioDef>,
    #[serde(default)]
    pub entropy_metrics: Vec<EntropyMetric>,
    pub conditions: Vec<ConditionDef>,
    #[serde(default)]
    pub windowing: WindowingConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
}

impl ExtractionConfig {
    /// Canonical EEG montage: five regions, five bands, two ratios, both entropies
    ///
    /// Windows default to full condition length. Sample entropy is quadratic
    /// in window length, so for long conditions at high sample rates switch to
    /// [`WindowingConfig::rolling`] or drop [`EntropyMetric::SampleEntropy`].
    pub fn eeg_default() -> Self {
        Self {
            regions: vec![
                RegionDef::new("frontal", &["Fp1", "Fp2", "F3", "F4", "Fz", "F7", "F8"]),
                RegionDef::new("central", &["C3", "C4", "Cz"]),
                RegionDef::new("parietal", &["P3", "P4", "Pz"]),
                RegionDef::new("occipital", &["O1", "O2", "Oz"]),
                RegionDef::new("temporal", &["T7", "T8", "P7", "P8"]),
                RegionDef::new("frontal_left", &["Fp1", "F3", "F7"]),
                RegionDef::new("frontal_right", &["Fp2", "F4", "F8"]),
            ],
            bands: vec![
                BandDef::new("delta", 1.0, 4.0),
                BandDef::new("theta", 4.0, 8.0),
                BandDef::new("alpha", 8.0, 13.0),
                BandDef::new("beta", 13.0, 30.0),
                BandDef::new("gamma", 30.0, 45.0),
            ],
            features: FeatureToggles::default(),
            ratios: vec![
                RatioDef::new(
                    "frontal_alpha_asymmetry",
                    ("frontal_right", "alpha"),
                    ("frontal_left", "alpha"),
                ),
                RatioDef::new("frontal_theta_beta_ratio", ("frontal", "theta"), ("frontal", "beta")),
            ],
            entropy_metrics: vec![EntropyMetric::SpectralEntropy, EntropyMetric::SampleEntropy],
            conditions: vec![
                ConditionDef::new("Baseline", &["forest", "rest"], 180.0),
                ConditionDef::new("Task", &["stress", "arithmetic"], 300.0)
                    .with_reference("Baseline"),
            ],
            windowing: WindowingConfig::default(),
            correction: CorrectionConfig::default(),
        }
    }

    pub fn region(&self, name: &str) -> Option<usize> {
        self.regions.iter().position(|r| r.name == name)
    }

    pub fn band(&self, name: &str) -> Option<usize> {
        self.bands.iter().position(|b| b.name == name)
    }

    pub fn condition(&self, name: &str) -> Option<usize> {
        self.conditions.iter().position(|c| c.name == name)
    }

    /// Validate the configuration and build its output schema
    pub fn validate(self) -> WfxResult<ValidatedConfig> {
        // Regions, bands and feature toggles are checked by the schema builder.
        let schema = Schema::build(&self)?;

        let mut ratio_names = HashSet::new();
        for ratio in &self.ratios {
            if !ratio_names.insert(ratio.name.as_str()) {
                return Err(config_error!("duplicate ratio '{}'", ratio.name));
            }
            for side in [&ratio.minuend, &ratio.subtrahend] {
                if self.region(&side.region).is_none() {
                    return Err(config_error!(
                        "ratio '{}' references unknown region '{}'",
                        ratio.name,
                        side.region
                    ));
                }
                if self.band(&side.band).is_none() {
                    return Err(config_error!(
                        "ratio '{}' references unknown band '{}'",
                        ratio.name,
                        side.band
                    ));
                }
            }
        }

        self.validate_conditions()?;
        self.validate_windowing()?;

        if !(self.correction.reference_duration_secs.is_finite()
            && self.correction.reference_duration_secs > 0.0)
        {
            return Err(config_error!(
                "reference duration must be positive, got {}",
                self.correction.reference_duration_secs
            ));
        }

        Ok(ValidatedConfig { config: self, schema })
    }

    fn validate_conditions(&self) -> WfxResult<()> {
        if self.conditions.is_empty() {
            return Err(config_error!("at least one condition must be defined"));
        }

        let mut names = HashSet::new();
        for condition in &self.conditions {
            if condition.name.trim().is_empty() {
                return Err(config_error!("condition name must not be empty"));
            }
            if !names.insert(condition.name.to_lowercase()) {
                return Err(config_error!("duplicate condition '{}'", condition.name));
            }
            if !(condition.duration_secs.is_finite() && condition.duration_secs > 0.0) {
                return Err(config_error!(
                    "condition '{}' duration must be positive, got {}",
                    condition.name,
                    condition.duration_secs
                ));
            }
            if condition.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(config_error!("condition '{}' has an empty alias", condition.name));
            }
            if let Some(reference) = &condition.reference {
                if reference == &condition.name {
                    return Err(config_error!(
                        "condition '{}' cannot be its own reference",
                        condition.name
                    ));
                }
                if self.condition(reference).is_none() {
                    return Err(config_error!(
                        "condition '{}' references unknown condition '{}'",
                        condition.name,
                        reference
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_windowing(&self) -> WfxResult<()> {
        let windowing = &self.windowing;
        if !windowing.is_rolling() {
            return Ok(());
        }
        if !(windowing.window_secs.is_finite() && windowing.window_secs > 0.0) {
            return Err(config_error!(
                "rolling window length must be positive, got {}",
                windowing.window_secs
            ));
        }
        if !(0.0..1.0).contains(&windowing.overlap) {
            return Err(config_error!(
                "rolling overlap must be in [0, 1), got {}",
                windowing.overlap
            ));
        }
        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> WfxResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| WfxError::Serialization {
            reason: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> WfxResult<Self> {
        serde_json::from_str(json).map_err(|e| config_error!("Failed to parse configuration: {}", e))
    }
}

/// Configuration that passed validation, paired with its schema
///
/// Read-only for the lifetime of a run and safe to share across workers.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    config: ExtractionConfig,
    schema: Schema,
}

impl ValidatedConfig {
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn regions(&self) -> &[RegionDef] {
        &self.config.regions
    }

    pub fn bands(&self) -> &[BandDef] {
        &self.config.bands
    }

    pub fn ratios(&self) -> &[RatioDef] {
        &self.config.ratios
    }

    pub fn conditions(&self) -> &[ConditionDef] {
        &self.config.conditions
    }

    pub fn windowing(&self) -> &WindowingConfig {
        &self.config.windowing
    }

    pub fn correction(&self) -> &CorrectionConfig {
        &self.config.correction
    }

    pub fn features(&self) -> FeatureToggles {
        self.config.features
    }

    /// Index pair for a ratio side; always present after validation
    pub(crate) fn band_ref(&self, side: &BandRef) -> Option<(usize, usize)> {
        Some((self.config.region(&side.region)?, self.config.band(&side.band)?))
    }
}

//! WFX-Processing: configuration, planning and feature math
//!
//! Validates the extraction configuration into a fixed output schema, plans
//! condition windows from event markers and computes per-window features
//! (log band power, ratios, spectral and sample entropy).

pub mod config;
pub mod extractor;
pub mod features;
pub mod planner;
pub mod schema;
pub mod spectral;

pub use config::{
    BandDef, BandRef, ConditionDef, CorrectionConfig, CorrectionMode, EntropyMetric,
    ExtractionConfig, FeatureToggles, RatioDef, RegionDef, ValidatedConfig, WindowMode,
    WindowingConfig,
};
pub use extractor::{ChannelMasks, WindowExtractor};
pub use features::FeatureVector;
pub use planner::{BaselinePlan, Plan, PlanSkip, PlannedCondition, WindowPlanner};
pub use schema::{FeatureKey, Schema};
pub use spectral::{welch_psd, Spectrum, WelchEstimator};

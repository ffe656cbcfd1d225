//! Run configuration and the shared run context

use crate::artifact::partial_file;
use crate::source::{JsonRecordingSource, RecordingSource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wfx_core::{config_error, UnitId, WfxError, WfxResult};
use wfx_processing::{ExtractionConfig, ValidatedConfig};

/// Directory name used for partial artifacts when none is configured
pub const DEFAULT_PARTIAL_DIR: &str = ".wfx_partial";

/// Suffix appended to the output path for the merge manifest
pub const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Run-level settings: what to process and where artifacts go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Requested units in output order
    pub units: Vec<String>,
    /// Directory holding `<unit>.json` recordings
    pub recording_dir: PathBuf,
    /// Final CSV table
    pub output: PathBuf,
    /// Partial artifact directory; defaults next to the output
    pub partial_dir: Option<PathBuf>,
    /// Worker threads; 0 picks the available parallelism
    pub workers: usize,
    /// Reprocess every requested unit
    pub force: bool,
    /// Leave partial artifacts in place after merging
    pub keep_partials: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            recording_dir: PathBuf::from("recordings"),
            output: PathBuf::from("features.csv"),
            partial_dir: None,
            workers: 0,
            force: false,
            keep_partials: false,
        }
    }
}

/// Complete configuration file: extraction plus run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub run: RunSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { extraction: ExtractionConfig::eeg_default(), run: RunSettings::default() }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> WfxResult<Self> {
        serde_json::from_str(json).map_err(|e| config_error!("Failed to parse configuration: {}", e))
    }

    pub fn to_json(&self) -> WfxResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| WfxError::Serialization {
            reason: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> WfxResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            config_error!("cannot read configuration {}: {}", path.display(), e)
        })?;
        Self::from_json(&json)
    }
}

/// Everything a run needs, built once and shared read-only by all workers
pub struct RunContext {
    config: ValidatedConfig,
    units: Vec<UnitId>,
    output: PathBuf,
    partial_dir: PathBuf,
    workers: usize,
    force: bool,
    keep_partials: bool,
    source: Arc<dyn RecordingSource>,
}

impl RunContext {
    /// Validate the configuration and read recordings from `recording_dir`
    pub fn new(config: EngineConfig) -> WfxResult<Self> {
        let source = Arc::new(JsonRecordingSource::new(&config.run.recording_dir));
        Self::with_source(config, source)
    }

    /// Validate the configuration with a caller-supplied recording source
    pub fn with_source(config: EngineConfig, source: Arc<dyn RecordingSource>) -> WfxResult<Self> {
        let EngineConfig { extraction, run } = config;
        let validated = extraction.validate()?;

        let mut seen = HashSet::new();
        let mut units = Vec::with_capacity(run.units.len());
        for raw in &run.units {
            let unit = UnitId::new(raw.as_str())?;
            if !seen.insert(unit.clone()) {
                return Err(config_error!("unit '{}' is requested twice", unit));
            }
            units.push(unit);
        }

        if run.output.as_os_str().is_empty() {
            return Err(config_error!("output path must not be empty"));
        }
        let partial_dir = run.partial_dir.clone().unwrap_or_else(|| {
            run.output
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DEFAULT_PARTIAL_DIR)
        });

        let workers = match run.workers {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        };

        Ok(Self {
            config: validated,
            units,
            output: run.output,
            partial_dir,
            workers,
            force: run.force,
            keep_partials: run.keep_partials,
            source,
        })
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Requested units in output order
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Sidecar manifest of the final table
    pub fn manifest_path(&self) -> PathBuf {
        let mut path = OsString::from(self.output.as_os_str());
        path.push(MANIFEST_SUFFIX);
        PathBuf::from(path)
    }

    pub fn partial_dir(&self) -> &Path {
        &self.partial_dir
    }

    /// Unit-local partial artifact
    pub fn partial_path(&self, unit: &UnitId) -> PathBuf {
        partial_file(&self.partial_dir, unit)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn keep_partials(&self) -> bool {
        self.keep_partials
    }

    pub fn source(&self) -> &dyn RecordingSource {
        self.source.as_ref()
    }
}

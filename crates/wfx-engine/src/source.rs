//! Recording sources
//!
//! Workers load recordings through [`RecordingSource`] so the engine does not
//! care where a unit's signal comes from. The shipped source reads one JSON
//! document per unit.

use crate::artifact::write_atomic;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use wfx_core::{recording_error, Event, Recording, UnitId, WfxError, WfxResult};

/// Loads the recording of one unit
pub trait RecordingSource: Send + Sync {
    /// Load and validate a unit's recording
    ///
    /// An absent recording is reported as `WfxError::MissingRecording`.
    fn load(&self, unit: &UnitId) -> WfxResult<Recording>;

    /// Human-readable location, for logs
    fn locate(&self, unit: &UnitId) -> String;
}

/// On-disk recording document
///
/// `data` is channel-major: one inner array per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFile {
    pub channel_labels: Vec<String>,
    pub sample_rate: f64,
    pub data: Vec<Vec<f64>>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl RecordingFile {
    pub fn from_recording(recording: &Recording) -> Self {
        Self {
            channel_labels: recording.channel_labels().to_vec(),
            sample_rate: recording.sample_rate(),
            data: recording.data().rows().into_iter().map(|row| row.to_vec()).collect(),
            events: recording.events().to_vec(),
        }
    }

    /// Validate into a [`Recording`]
    pub fn into_recording(self) -> WfxResult<Recording> {
        let n_channels = self.data.len();
        let n_samples = self.data.first().map_or(0, Vec::len);
        if let Some((i, row)) = self.data.iter().enumerate().find(|(_, row)| row.len() != n_samples) {
            return Err(recording_error!(
                "channel {} has {} samples, expected {}",
                i,
                row.len(),
                n_samples
            ));
        }

        let flat: Vec<f64> = self.data.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n_channels, n_samples), flat)
            .map_err(|e| recording_error!("malformed data matrix: {}", e))?;
        Recording::new(self.channel_labels, self.sample_rate, data, self.events)
    }
}

/// Reads `<dir>/<unit>.json`
#[derive(Debug, Clone)]
pub struct JsonRecordingSource {
    dir: PathBuf,
}

impl JsonRecordingSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, unit: &UnitId) -> PathBuf {
        self.dir.join(format!("{}.json", unit))
    }
}

impl RecordingSource for JsonRecordingSource {
    fn load(&self, unit: &UnitId) -> WfxResult<Recording> {
        let path = self.path_for(unit);
        let file = std::fs::File::open(&path).map_err(|e| WfxError::MissingRecording {
            unit: unit.to_string(),
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let document: RecordingFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| recording_error!("{}: {}", path.display(), e))?;
        document.into_recording()
    }

    fn locate(&self, unit: &UnitId) -> String {
        self.path_for(unit).display().to_string()
    }
}

/// Write a recording as a JSON document, atomically
pub fn save_recording(path: &Path, recording: &Recording) -> WfxResult<()> {
    let document = RecordingFile::from_recording(recording);
    write_atomic(path, |file| {
        serde_json::to_writer(&mut *file, &document).map_err(|e| WfxError::Serialization {
            reason: format!("Failed to serialize recording: {}", e),
        })?;
        file.flush()?;
        Ok(())
    })
}

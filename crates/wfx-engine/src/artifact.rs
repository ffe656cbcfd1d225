//! Partial and final artifacts
//!
//! Every artifact is written to a temporary file in its destination directory
//! and renamed into place, so a reader never observes a half-written file
//! under the final name.

use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use wfx_core::{UnitId, WfxError, WfxResult};
use wfx_processing::FeatureVector;

fn artifact_error(path: &Path, reason: impl std::fmt::Display) -> WfxError {
    WfxError::Artifact { path: path.display().to_string(), reason: reason.to_string() }
}

/// Partial artifact of `unit` inside `dir`
pub fn partial_file(dir: &Path, unit: &UnitId) -> PathBuf {
    dir.join(format!("{}.csv", unit))
}

/// Write through `write` into a temp file, then rename it to `path`
pub fn write_atomic<F>(path: &Path, write: F) -> WfxResult<()>
where
    F: FnOnce(&mut dyn Write) -> WfxResult<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| artifact_error(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| artifact_error(dir, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer.flush().map_err(|e| artifact_error(path, e))?;
    }
    temp.as_file().sync_all().map_err(|e| artifact_error(path, e))?;
    temp.persist(path).map_err(|e| artifact_error(path, e.error))?;
    Ok(())
}

/// Delete an artifact; `false` if there was nothing to delete
pub fn remove_artifact(path: &Path) -> WfxResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(artifact_error(path, e)),
    }
}

/// Render a feature value the way the table stores it
///
/// Shortest round-trip decimal; NaN is written as `NaN`.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

/// Optional rolling-window identifiers of a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpan {
    pub index: usize,
    /// Seconds from recording start
    pub start: f64,
    /// Seconds from recording start, exclusive
    pub end: f64,
}

/// One output row before rendering
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub unit: String,
    pub condition: String,
    pub window: Option<WindowSpan>,
    pub features: FeatureVector,
}

impl OutputRow {
    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![self.unit.clone(), self.condition.clone()];
        if let Some(window) = &self.window {
            record.push(window.index.to_string());
            record.push(format_value(window.start));
            record.push(format_value(window.end));
        }
        record.extend(self.features.values().iter().map(|v| format_value(*v)));
        record
    }
}

/// Header plus rendered rows, as read back from disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Rows whose first field equals `unit`
    pub fn rows_for<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = &'a Vec<String>> + 'a {
        self.rows.iter().filter(move |row| row.first().map(String::as_str) == Some(unit))
    }
}

/// Write a CSV table atomically
pub fn write_table(path: &Path, columns: &[String], rows: &[Vec<String>]) -> WfxResult<()> {
    write_atomic(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(columns).map_err(|e| artifact_error(path, e))?;
        for row in rows {
            writer.write_record(row).map_err(|e| artifact_error(path, e))?;
        }
        writer.flush().map_err(|e| artifact_error(path, e))?;
        Ok(())
    })
}

/// Read a CSV table written by [`write_table`]
pub fn read_table(path: &Path) -> WfxResult<Table> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| artifact_error(path, e))?;
    let columns = reader
        .headers()
        .map_err(|e| artifact_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| artifact_error(path, e))
        })
        .collect::<WfxResult<Vec<Vec<String>>>>()?;
    Ok(Table { columns, rows })
}

/// Sidecar describing what the final table contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub columns: Vec<String>,
    /// Units whose rows are in the table, in table order
    pub units: Vec<String>,
}

pub fn write_manifest(path: &Path, manifest: &Manifest) -> WfxResult<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, manifest).map_err(|e| WfxError::Serialization {
            reason: format!("Failed to serialize manifest: {}", e),
        })?;
        out.write_all(b"\n")?;
        Ok(())
    })
}

/// Read a manifest; `None` if there is none
pub fn read_manifest(path: &Path) -> WfxResult<Option<Manifest>> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(artifact_error(path, e)),
    };
    serde_json::from_str(&json).map(Some).map_err(|e| artifact_error(path, e))
}

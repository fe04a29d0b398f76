//! The feature table handed to downstream classifiers, and its export.
//!
//! One row per window: every feature column of the run's [`FeatureSchema`]
//! followed by the device id, majority activity label and window start
//! time. Column names are stable; consumers key on them.

use crate::config::ExtractorConfig;
use crate::core::features::{FeatureSchema, WindowFeatures};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Names of the three metadata columns appended to every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataColumns {
    pub device_id: String,
    pub activity: String,
    pub timestamp: String,
}

impl MetadataColumns {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            device_id: config.id_column.clone(),
            activity: config.activity_column.clone(),
            timestamp: config.time_column.clone(),
        }
    }
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

/// Features and metadata of one window. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub device_id: String,
    /// Most frequent activity label within the window
    pub activity: String,
    /// Timestamp of the window's first row
    pub timestamp: f64,
    pub features: WindowFeatures,
}

impl FeatureVector {
    pub fn new(device_id: &str, activity: &str, timestamp: f64, features: WindowFeatures) -> Self {
        Self {
            device_id: device_id.to_string(),
            activity: activity.to_string(),
            timestamp,
            features,
        }
    }

    /// Feature values in schema order.
    pub fn values(&self) -> Vec<f64> {
        self.features.values()
    }
}

/// Errors that can occur while exporting a feature table.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    /// Pretty-printed array of records
    Json,
    /// One record per line
    Jsonl,
}

impl OutputFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            other => Err(format!("unknown output format '{other}' (csv, json, jsonl)")),
        }
    }
}

/// One row per window, all sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    metadata: MetadataColumns,
    rows: Vec<FeatureVector>,
}

impl FeatureTable {
    pub fn new(schema: FeatureSchema, metadata: MetadataColumns, rows: Vec<FeatureVector>) -> Self {
        debug_assert!(rows.iter().all(|r| r.features.axes.len() == schema.axis_columns().len()));
        Self {
            schema,
            metadata,
            rows,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All output columns: features, then device id, activity and time.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.schema.names();
        names.push(self.metadata.device_id.clone());
        names.push(self.metadata.activity.clone());
        names.push(self.metadata.timestamp.clone());
        names
    }

    /// Index of a feature column within [`FeatureVector::values`].
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.position(name)
    }

    /// A single feature value.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r.values()[idx])
    }

    /// Distinct device ids in row order.
    pub fn device_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !ids.contains(&row.device_id.as_str()) {
                ids.push(&row.device_id);
            }
        }
        ids
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.column_names())?;

        for row in &self.rows {
            let mut record: Vec<String> = row.values().iter().map(|v| v.to_string()).collect();
            record.push(row.device_id.clone());
            record.push(row.activity.clone());
            record.push(row.timestamp.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write the table as a pretty-printed JSON array of records.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, &self.records())?;
        Ok(())
    }

    /// Write the table as JSON Lines, one record per window.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        for record in self.records() {
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: W, format: OutputFormat) -> Result<(), ExportError> {
        match format {
            OutputFormat::Csv => self.write_csv(writer),
            OutputFormat::Json => self.write_json(writer),
            OutputFormat::Jsonl => self.write_jsonl(writer),
        }
    }

    /// Write the table to a file, creating parent directories as needed.
    pub fn write_to_path(&self, path: &Path, format: OutputFormat) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write(file, format)
    }

    fn records(&self) -> Vec<Record<'_>> {
        let names = self.schema.names();
        self.rows
            .iter()
            .map(|row| Record {
                names: names.clone(),
                metadata: &self.metadata,
                row,
            })
            .collect()
    }
}

/// A row serialized as an ordered map from column name to value.
struct Record<'a> {
    names: Vec<String>,
    metadata: &'a MetadataColumns,
    row: &'a FeatureVector,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.row.values();
        let mut map = serializer.serialize_map(Some(values.len() + 3))?;
        for (name, value) in self.names.iter().zip(&values) {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(&self.metadata.device_id, &self.row.device_id)?;
        map.serialize_entry(&self.metadata.activity, &self.row.activity)?;
        map.serialize_entry(&self.metadata.timestamp, &self.row.timestamp)?;
        map.end()
    }
}

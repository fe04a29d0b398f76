//! Dataset assembly: load every recording CSV in a directory, tag rows with
//! the activity and device taken from the file name, merge, and drop rows
//! that repeat a (timestamp, device) pair.
//!
//! Recordings of different activities may overlap in time. When a reading
//! appears in more than one file only its first occurrence is kept, where
//! files are visited in sorted path order.

use crate::config::ExtractorConfig;
use crate::dataset::table::{Column, SensorTable};
use crate::error::FeatureError;
use chrono::{DateTime, NaiveDateTime};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Datetime layouts accepted in the time column when it is not numeric.
const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Errors that can occur while assembling the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("no CSV files found in {0:?}")]
    NoInputFiles(PathBuf),
    #[error("no usable rows in any CSV file under {0:?}")]
    EmptyDataset(PathBuf),
    #[error("file name {0:?} does not follow <prefix>_<activity>_<device>.csv")]
    FileName(PathBuf),
    #[error("{file:?} is missing column '{column}'")]
    MissingColumn { file: PathBuf, column: String },
    #[error("CSV error in {file:?}: {source}")]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Table(#[from] FeatureError),
}

/// The merged table plus bookkeeping about how it was built.
#[derive(Debug, Clone)]
pub struct AssembledDataset {
    pub table: SensorTable,
    pub files_loaded: usize,
    pub files_skipped: usize,
    /// Data rows seen across all loaded files
    pub rows_read: usize,
    /// Rows discarded for unparsable or non-finite values
    pub rows_dropped: usize,
    /// Rows discarded as repeats of an earlier (timestamp, device) pair
    pub duplicates_removed: usize,
}

/// Readings parsed from one recording file.
#[derive(Debug)]
struct Recording {
    activity: String,
    device_id: String,
    time: Vec<f64>,
    /// One vector per entry of `ExtractorConfig::feature_columns`
    channels: Vec<Vec<f64>>,
    rows_read: usize,
    rows_dropped: usize,
}

/// Load and merge every `*.csv` recording in `dir`.
pub fn combine_datasets(
    dir: &Path,
    config: &ExtractorConfig,
) -> Result<AssembledDataset, DatasetError> {
    let paths = list_csv_files(dir)?;
    if paths.is_empty() {
        return Err(DatasetError::NoInputFiles(dir.to_path_buf()));
    }

    let mut recordings = Vec::new();
    let mut files_skipped = 0;
    for path in &paths {
        match load_recording(path, config) {
            Ok(recording) => {
                info!(
                    file = %path.display(),
                    activity = %recording.activity,
                    device = %recording.device_id,
                    rows = recording.time.len(),
                    "loaded recording"
                );
                recordings.push(recording);
            }
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                files_skipped += 1;
            }
        }
    }

    let rows_read = recordings.iter().map(|r| r.rows_read).sum();
    let rows_dropped = recordings.iter().map(|r| r.rows_dropped).sum();
    let merged = merge(&recordings, config)?;
    if merged.is_empty() {
        return Err(DatasetError::EmptyDataset(dir.to_path_buf()));
    }

    let keep = first_occurrences(&merged, config)?;
    let duplicates_removed = merged.len() - keep.len();
    let table = if duplicates_removed == 0 {
        merged
    } else {
        debug!(duplicates_removed, "dropping repeated (timestamp, device) rows");
        merged.select_rows(&keep)
    };

    Ok(AssembledDataset {
        table,
        files_loaded: recordings.len(),
        files_skipped,
        rows_read,
        rows_dropped,
        duplicates_removed,
    })
}

/// Split a recording file name into (activity, device id).
///
/// `cow3_grazing_D12_day2.csv` yields `("grazing", "D12")`.
pub fn parse_file_name(path: &Path) -> Result<(String, String), DatasetError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DatasetError::FileName(path.to_path_buf()))?;

    let parts: Vec<&str> = stem.split('_').collect();
    match parts.as_slice() {
        [_, activity, device, ..] if !activity.is_empty() && !device.is_empty() => {
            Ok((activity.to_string(), device.to_string()))
        }
        _ => Err(DatasetError::FileName(path.to_path_buf())),
    }
}

/// Parse a time cell as seconds. Numeric cells are taken as-is; datetimes
/// become seconds since the Unix epoch.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_micros() as f64 / 1e6);
    }
    NAIVE_TIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|dt| dt.and_utc().timestamp_micros() as f64 / 1e6)
    })
}

/// Pitch in degrees from a (w, x, y, z) orientation quaternion.
pub fn pitch_from_quaternion(w: f64, x: f64, y: f64, z: f64) -> f64 {
    let sin_pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    sin_pitch.asin().to_degrees()
}

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_recording(path: &Path, config: &ExtractorConfig) -> Result<Recording, DatasetError> {
    let (activity, device_id) = parse_file_name(path)?;
    let csv_err = |source: csv::Error| DatasetError::Csv {
        file: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let index_of = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| {
        index_of(name).ok_or_else(|| DatasetError::MissingColumn {
            file: path.to_path_buf(),
            column: name.to_string(),
        })
    };

    let time_idx = require(config.time_column.as_str())?;
    let sensor_idx = config
        .sensor_columns
        .iter()
        .map(|name| require(name.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let pitch_idx = index_of(config.pitch_column.as_str());

    // Without a pitch column the secondary IMU's quaternion is required.
    let quaternion_slots = match pitch_idx {
        Some(_) => None,
        None => {
            let slots = ExtractorConfig::quaternion_columns(&config.secondary_imu)
                .iter()
                .map(|name| {
                    config
                        .sensor_columns
                        .iter()
                        .position(|c| c == name)
                        .ok_or_else(|| DatasetError::MissingColumn {
                            file: path.to_path_buf(),
                            column: config.pitch_column.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some([slots[0], slots[1], slots[2], slots[3]])
        }
    };

    let channel_count = sensor_idx.len() + 1;
    let mut recording = Recording {
        activity,
        device_id,
        time: Vec::new(),
        channels: vec![Vec::new(); channel_count],
        rows_read: 0,
        rows_dropped: 0,
    };

    let mut row = Vec::with_capacity(channel_count);
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        recording.rows_read += 1;

        let parse_cell = |idx: usize| {
            record
                .get(idx)
                .and_then(|cell| cell.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        let Some(time) = record.get(time_idx).and_then(parse_timestamp) else {
            recording.rows_dropped += 1;
            continue;
        };

        row.clear();
        row.extend(sensor_idx.iter().map(|&idx| parse_cell(idx)));
        let pitch = match (pitch_idx, quaternion_slots) {
            (Some(idx), _) => parse_cell(idx),
            (None, Some([w, x, y, z])) => match (row[w], row[x], row[y], row[z]) {
                (Some(w), Some(x), Some(y), Some(z)) => Some(pitch_from_quaternion(w, x, y, z)),
                _ => None,
            },
            (None, None) => None,
        };
        row.push(pitch);

        if row.iter().any(Option::is_none) {
            recording.rows_dropped += 1;
            continue;
        }

        recording.time.push(time);
        for (channel, value) in recording.channels.iter_mut().zip(row.iter().flatten()) {
            channel.push(*value);
        }
    }

    if recording.rows_dropped > 0 {
        debug!(
            file = %path.display(),
            dropped = recording.rows_dropped,
            "dropped malformed rows"
        );
    }

    Ok(recording)
}

fn merge(recordings: &[Recording], config: &ExtractorConfig) -> Result<SensorTable, DatasetError> {
    let total: usize = recordings.iter().map(|r| r.time.len()).sum();

    let mut time = Vec::with_capacity(total);
    let mut ids = Vec::with_capacity(total);
    let mut activities = Vec::with_capacity(total);
    let feature_columns = config.feature_columns();
    let mut channels: Vec<Vec<f64>> = vec![Vec::with_capacity(total); feature_columns.len()];

    for recording in recordings {
        let n = recording.time.len();
        time.extend_from_slice(&recording.time);
        ids.extend(std::iter::repeat(recording.device_id.clone()).take(n));
        activities.extend(std::iter::repeat(recording.activity.clone()).take(n));
        for (merged, channel) in channels.iter_mut().zip(&recording.channels) {
            merged.extend_from_slice(channel);
        }
    }

    let mut table = SensorTable::new()
        .with_column(config.time_column.clone(), Column::Float(time))?
        .with_column(config.id_column.clone(), Column::Text(ids))?
        .with_column(config.activity_column.clone(), Column::Text(activities))?;
    for (name, values) in feature_columns.into_iter().zip(channels) {
        table.push_column(name, Column::Float(values))?;
    }

    Ok(table)
}

/// Indices of rows whose (timestamp, device) pair has not been seen earlier.
fn first_occurrences(
    table: &SensorTable,
    config: &ExtractorConfig,
) -> Result<Vec<usize>, DatasetError> {
    let time = table.float(&config.time_column)?;
    let ids = table.text(&config.id_column)?;

    let mut seen = HashSet::with_capacity(table.len());
    Ok((0..table.len())
        .filter(|&i| seen.insert((timestamp_key(time[i]), ids[i].as_str())))
        .collect())
}

/// Bit pattern of a timestamp with `-0.0` folded into `0.0`, so equal
/// timestamps always share a key.
fn timestamp_key(t: f64) -> u64 {
    if t == 0.0 {
        0.0f64.to_bits()
    } else {
        t.to_bits()
    }
}

//! Configuration for grazing-activity feature extraction.
//!
//! Column names and the sensor suite live in an [`ExtractorConfig`] value
//! that is passed into every extraction call, so alternate sensor suites
//! (and tests) never have to touch global state.

use crate::core::windowing::WindowParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for the extractor binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window size and step, in rows
    pub window: WindowParams,

    /// Column names and sensor suite
    pub columns: ExtractorConfig,

    /// Directory holding the raw per-recording CSV files
    pub data_path: PathBuf,

    /// Default destination for the feature table
    pub output_path: PathBuf,

    /// Directory for run reports
    pub state_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grazing-features");

        Self {
            window: WindowParams::default(),
            columns: ExtractorConfig::default(),
            data_path: PathBuf::from("data"),
            output_path: PathBuf::from("features.csv"),
            state_path: state_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grazing-features")
            .join("config.json")
    }

    /// Path of the report written by the most recent run.
    pub fn report_path(&self) -> PathBuf {
        self.state_path.join("last_run.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.state_path)?;
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Column names and sensor layout of the merged recording table.
///
/// The two IMUs are addressed by column prefix. The primary IMU supplies
/// the gyroscope magnitude, the signal magnitude area and the per-axis
/// features; both IMUs contribute to the averaged accelerometer magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub time_column: String,
    pub id_column: String,
    pub activity_column: String,
    pub pitch_column: String,
    /// Raw channels every recording carries
    pub sensor_columns: Vec<String>,
    pub primary_imu: String,
    /// Second accelerometer, also the quaternion source for pitch
    pub secondary_imu: String,
    /// Axes that receive per-axis features on the primary IMU
    pub axis_suffixes: Vec<String>,
}

const BNO055_CHANNELS: [&str; 16] = [
    "ARX", "ARY", "ARZ", "AX", "AY", "AZ", "GX", "GY", "GZ", "MX", "MY", "MZ", "Q0", "Q1", "Q2",
    "Q3",
];
const MPU9250_CHANNELS: [&str; 9] = ["AX", "AY", "AZ", "GX", "GY", "GZ", "MX", "MY", "MZ"];

impl Default for ExtractorConfig {
    fn default() -> Self {
        let sensor_columns = BNO055_CHANNELS
            .iter()
            .map(|c| format!("BNO055_{c}"))
            .chain(MPU9250_CHANNELS.iter().map(|c| format!("MPU9250_{c}")))
            .collect();

        Self {
            time_column: "Time".to_string(),
            id_column: "Device ID".to_string(),
            activity_column: "Activity".to_string(),
            pitch_column: "pitch".to_string(),
            sensor_columns,
            primary_imu: "MPU9250".to_string(),
            secondary_imu: "BNO055".to_string(),
            axis_suffixes: ["AX", "AY", "AZ", "GX", "GY", "GZ"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ExtractorConfig {
    /// Build a channel column name from an IMU prefix and an axis suffix.
    pub fn column(prefix: &str, suffix: &str) -> String {
        format!("{prefix}_{suffix}")
    }

    pub fn accelerometer_columns(prefix: &str) -> [String; 3] {
        ["AX", "AY", "AZ"].map(|axis| Self::column(prefix, axis))
    }

    pub fn gyroscope_columns(prefix: &str) -> [String; 3] {
        ["GX", "GY", "GZ"].map(|axis| Self::column(prefix, axis))
    }

    /// Orientation quaternion columns in (w, x, y, z) order.
    pub fn quaternion_columns(prefix: &str) -> [String; 4] {
        ["Q0", "Q1", "Q2", "Q3"].map(|axis| Self::column(prefix, axis))
    }

    /// Columns that receive per-axis features. These are optional.
    pub fn axis_columns(&self) -> Vec<String> {
        self.axis_suffixes
            .iter()
            .map(|suffix| Self::column(&self.primary_imu, suffix))
            .collect()
    }

    /// All numeric channels loaded from a recording: sensors plus pitch.
    pub fn feature_columns(&self) -> Vec<String> {
        let mut columns = self.sensor_columns.clone();
        columns.push(self.pitch_column.clone());
        columns
    }

    /// Columns whose absence makes extraction fail.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.time_column.clone(),
            self.id_column.clone(),
            self.activity_column.clone(),
        ];
        columns.extend(Self::accelerometer_columns(&self.primary_imu));
        columns.extend(Self::accelerometer_columns(&self.secondary_imu));
        columns.extend(Self::gyroscope_columns(&self.primary_imu));
        columns
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

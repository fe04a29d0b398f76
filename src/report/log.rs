//! Run report for one extraction.
//!
//! Records what went into a run and what came out of it, so a feature file
//! can always be traced back to the inputs and parameters that produced it.

use crate::core::output::FeatureTable;
use crate::core::windowing::{ExtractionStats, WindowParams};
use crate::dataset::AssembledDataset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Accumulates statistics while a run is in progress.
#[derive(Debug)]
pub struct RunReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    params: WindowParams,
    data_path: PathBuf,
    output_path: Option<PathBuf>,
    files_loaded: usize,
    files_skipped: usize,
    rows_read: usize,
    rows_dropped: usize,
    duplicates_removed: usize,
    devices: usize,
    devices_without_windows: Vec<String>,
    windows: usize,
    feature_columns: usize,
    finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Start a report for a run over `data_path`.
    pub fn new(data_path: &Path, params: WindowParams) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            params,
            data_path: data_path.to_path_buf(),
            output_path: None,
            files_loaded: 0,
            files_skipped: 0,
            rows_read: 0,
            rows_dropped: 0,
            duplicates_removed: 0,
            devices: 0,
            devices_without_windows: Vec::new(),
            windows: 0,
            feature_columns: 0,
            finished_at: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record how the input dataset was assembled.
    pub fn record_dataset(&mut self, dataset: &AssembledDataset) {
        self.files_loaded = dataset.files_loaded;
        self.files_skipped = dataset.files_skipped;
        self.rows_read = dataset.rows_read;
        self.rows_dropped = dataset.rows_dropped;
        self.duplicates_removed = dataset.duplicates_removed;
    }

    /// Record the outcome of windowing and feature extraction.
    pub fn record_extraction(&mut self, stats: &ExtractionStats, features: &FeatureTable) {
        self.devices = stats.devices;
        self.devices_without_windows = stats.devices_without_windows.clone();
        self.windows = stats.windows;
        self.feature_columns = features.schema().len();
    }

    /// Record where the feature table was written.
    pub fn record_output(&mut self, path: &Path) {
        self.output_path = Some(path.to_path_buf());
    }

    /// Mark the run as finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ReportStats {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        ReportStats {
            run_id: self.run_id,
            started_at: self.started_at,
            duration_ms: (end - self.started_at).num_milliseconds().max(0) as u64,
            window_size: self.params.window_size,
            step_size: self.params.step_size,
            data_path: self.data_path.clone(),
            output_path: self.output_path.clone(),
            files_loaded: self.files_loaded,
            files_skipped: self.files_skipped,
            rows_read: self.rows_read,
            rows_dropped: self.rows_dropped,
            duplicates_removed: self.duplicates_removed,
            devices: self.devices,
            devices_without_windows: self.devices_without_windows.clone(),
            windows: self.windows,
            feature_columns: self.feature_columns,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        self.stats().summary()
    }

    /// Save the report as JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.stats()).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load a previously saved report.
    pub fn load(path: &Path) -> Result<ReportStats, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

/// Snapshot of a run's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub window_size: usize,
    pub step_size: usize,
    pub data_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub duplicates_removed: usize,
    pub devices: usize,
    pub devices_without_windows: Vec<String>,
    pub windows: usize,
    pub feature_columns: usize,
}

impl ReportStats {
    pub fn summary(&self) -> String {
        let short_devices = if self.devices_without_windows.is_empty() {
            "none".to_string()
        } else {
            self.devices_without_windows.join(", ")
        };
        let output = self
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "Run {}\n\
             - Started: {}\n\
             - Duration: {} ms\n\
             - Window: {} rows, step {}\n\
             \n\
             Input ({}):\n\
             - Files loaded: {} (skipped {})\n\
             - Rows read: {} (dropped {}, duplicates removed {})\n\
             \n\
             Output ({}):\n\
             - Devices: {}\n\
             - Devices too short for one window: {}\n\
             - Windows: {}\n\
             - Feature columns: {}",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.duration_ms,
            self.window_size,
            self.step_size,
            self.data_path.display(),
            self.files_loaded,
            self.files_skipped,
            self.rows_read,
            self.rows_dropped,
            self.duplicates_removed,
            output,
            self.devices,
            short_devices,
            self.windows,
            self.feature_columns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::FeatureSchema;
    use crate::core::output::MetadataColumns;
    use crate::dataset::SensorTable;

    fn dataset() -> AssembledDataset {
        AssembledDataset {
            table: SensorTable::new(),
            files_loaded: 4,
            files_skipped: 1,
            rows_read: 1200,
            rows_dropped: 3,
            duplicates_removed: 17,
        }
    }

    fn features() -> FeatureTable {
        FeatureTable::new(
            FeatureSchema::new(vec!["MPU9250_AX".to_string()]),
            MetadataColumns::default(),
            Vec::new(),
        )
    }

    #[test]
    fn test_report_counting() {
        let mut report = RunReport::new(Path::new("data"), WindowParams::default());
        report.record_dataset(&dataset());
        report.record_extraction(
            &ExtractionStats {
                rows: 1180,
                devices: 3,
                devices_without_windows: vec!["D9".to_string()],
                windows: 40,
            },
            &features(),
        );
        report.finish();

        let stats = report.stats();
        assert_eq!(stats.run_id, report.run_id());
        assert_eq!(stats.files_loaded, 4);
        assert_eq!(stats.duplicates_removed, 17);
        assert_eq!(stats.devices, 3);
        assert_eq!(stats.windows, 40);
        assert_eq!(stats.feature_columns, 20);
        assert_eq!(stats.window_size, 50);
        assert_eq!(stats.output_path, None);
    }

    #[test]
    fn test_summary_format() {
        let mut report = RunReport::new(Path::new("data"), WindowParams::default());
        report.record_dataset(&dataset());
        let summary = report.summary();

        assert!(summary.contains("Files loaded: 4 (skipped 1)"));
        assert!(summary.contains("duplicates removed 17"));
        assert!(summary.contains("Devices too short for one window: none"));
        assert!(summary.contains("Window: 50 rows, step 25"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("grazing-report-{}", Uuid::new_v4()));
        let path = dir.join("last_run.json");

        let mut report = RunReport::new(Path::new("data"), WindowParams::default());
        report.record_dataset(&dataset());
        report.record_output(Path::new("out/features.csv"));
        report.finish();
        report.save(&path).unwrap();

        let loaded = RunReport::load(&path).unwrap();
        assert_eq!(loaded, report.stats());
        assert_eq!(loaded.output_path, Some(PathBuf::from("out/features.csv")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_report() {
        let path = std::env::temp_dir().join(format!("grazing-missing-{}.json", Uuid::new_v4()));
        assert!(RunReport::load(&path).is_err());
    }
}

//! Grouping readings by device and slicing them into fixed-size windows.
//!
//! Rows are stably sorted by timestamp (ties keep input order), partitioned
//! by device id into contiguous per-device buffers, and each buffer is cut
//! into windows of `window_size` rows starting every `step_size` rows. A
//! window never spans two devices, and a trailing run shorter than
//! `window_size` produces no window.

use crate::config::ExtractorConfig;
use crate::core::features::{ChannelLayout, FeatureExtractor};
use crate::core::output::{FeatureTable, FeatureVector, MetadataColumns};
use crate::dataset::SensorTable;
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Window size and step, both in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowParams {
    pub window_size: usize,
    pub step_size: usize,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            window_size: 50,
            step_size: 25,
        }
    }
}

impl WindowParams {
    pub fn new(window_size: usize, step_size: usize) -> Result<Self, FeatureError> {
        let params = Self {
            window_size,
            step_size,
        };
        params.validate()?;
        Ok(params)
    }

    /// Both values must be positive.
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.window_size == 0 {
            return Err(FeatureError::InvalidParameter {
                name: "window_size",
                value: self.window_size,
            });
        }
        if self.step_size == 0 {
            return Err(FeatureError::InvalidParameter {
                name: "step_size",
                value: self.step_size,
            });
        }
        Ok(())
    }

    /// Rows shared by consecutive windows of one device.
    pub fn overlap(&self) -> usize {
        self.window_size.saturating_sub(self.step_size)
    }
}

/// Number of windows a device with `rows` readings produces:
/// `floor((rows - size) / step) + 1` when `rows >= size`, else 0.
pub fn window_count(rows: usize, params: WindowParams) -> usize {
    if params.window_size == 0 || params.step_size == 0 || rows < params.window_size {
        return 0;
    }
    (rows - params.window_size) / params.step_size + 1
}

/// Start offsets of every window over `rows` readings.
pub fn window_offsets(rows: usize, params: WindowParams) -> impl Iterator<Item = usize> {
    (0..window_count(rows, params)).map(move |i| i * params.step_size)
}

/// All readings of one device, sorted by timestamp.
#[derive(Debug, Clone)]
pub struct DeviceSeries<'t> {
    device_id: &'t str,
    timestamps: Vec<f64>,
    activities: Vec<&'t str>,
    /// One buffer per [`ChannelLayout`] slot
    channels: Vec<Vec<f64>>,
}

impl<'t> DeviceSeries<'t> {
    /// Sort the table by timestamp and split it into per-device series,
    /// ordered by device id.
    pub fn partition(
        table: &'t SensorTable,
        config: &ExtractorConfig,
        layout: &ChannelLayout,
    ) -> Result<Vec<DeviceSeries<'t>>, FeatureError> {
        let time = table.float(&config.time_column)?;
        let ids = table.text(&config.id_column)?;
        let activities = table.text(&config.activity_column)?;
        let channels = layout
            .channel_names()
            .iter()
            .map(|name| table.float(name))
            .collect::<Result<Vec<_>, _>>()?;

        // sort_by is stable, so equal timestamps keep their input order.
        let mut order: Vec<usize> = (0..table.len()).collect();
        order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for idx in order {
            groups.entry(ids[idx].as_str()).or_default().push(idx);
        }

        Ok(groups
            .into_iter()
            .map(|(device_id, rows)| DeviceSeries {
                device_id,
                timestamps: rows.iter().map(|&i| time[i]).collect(),
                activities: rows.iter().map(|&i| activities[i].as_str()).collect(),
                channels: channels
                    .iter()
                    .map(|channel| rows.iter().map(|&i| channel[i]).collect())
                    .collect(),
            })
            .collect())
    }

    pub fn device_id(&self) -> &'t str {
        self.device_id
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// A view of rows `start..start + len`.
    pub fn window<'a>(&'a self, layout: &'a ChannelLayout, start: usize, len: usize) -> Window<'a> {
        assert!(len > 0, "window must contain at least one row");
        assert!(
            start + len <= self.len(),
            "window {start}..{} exceeds {} rows",
            start + len,
            self.len()
        );
        Window {
            layout,
            series: self,
            start,
            len,
        }
    }

    /// Every window of this series for the given parameters.
    pub fn windows<'a>(&'a self, layout: &'a ChannelLayout, params: WindowParams) -> Vec<Window<'a>> {
        window_offsets(self.len(), params)
            .map(|start| self.window(layout, start, params.window_size))
            .collect()
    }
}

/// A read-only run of consecutive rows from one device.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    layout: &'a ChannelLayout,
    series: &'a DeviceSeries<'a>,
    start: usize,
    len: usize,
}

impl<'a> Window<'a> {
    pub fn layout(&self) -> &'a ChannelLayout {
        self.layout
    }

    pub fn device_id(&self) -> &'a str {
        self.series.device_id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Samples of one channel slot.
    pub fn channel(&self, slot: usize) -> &'a [f64] {
        &self.series.channels[slot][self.start..self.start + self.len]
    }

    pub fn timestamps(&self) -> &'a [f64] {
        &self.series.timestamps[self.start..self.start + self.len]
    }

    pub fn activities(&self) -> &'a [&'a str] {
        &self.series.activities[self.start..self.start + self.len]
    }

    /// Timestamp of the window's first row.
    pub fn start_timestamp(&self) -> f64 {
        self.series.timestamps[self.start]
    }

    /// Most frequent activity label; ties go to the label seen first.
    pub fn majority_activity(&self) -> &'a str {
        majority_label(self.activities())
    }
}

/// Per-run bookkeeping alongside the feature table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub rows: usize,
    pub devices: usize,
    /// Devices with fewer rows than one window
    pub devices_without_windows: Vec<String>,
    pub windows: usize,
}

/// Slide windows over every device and compute one feature vector per
/// window.
pub fn create_windowed_features(
    table: &SensorTable,
    config: &ExtractorConfig,
    params: WindowParams,
) -> Result<FeatureTable, FeatureError> {
    extract_with_stats(table, config, params).map(|(features, _)| features)
}

/// Like [`create_windowed_features`], also returning run statistics.
pub fn extract_with_stats(
    table: &SensorTable,
    config: &ExtractorConfig,
    params: WindowParams,
) -> Result<(FeatureTable, ExtractionStats), FeatureError> {
    params.validate()?;
    let layout = ChannelLayout::resolve(table, config)?;
    let devices = DeviceSeries::partition(table, config, &layout)?;

    let mut extractor = FeatureExtractor::new();
    let mut stats = ExtractionStats {
        rows: table.len(),
        devices: devices.len(),
        ..ExtractionStats::default()
    };
    let mut rows = Vec::new();

    for series in &devices {
        let count = window_count(series.len(), params);
        debug!(
            device = series.device_id(),
            rows = series.len(),
            windows = count,
            "windowing device"
        );
        if count == 0 {
            stats.devices_without_windows.push(series.device_id().to_string());
            continue;
        }

        for window in series.windows(&layout, params) {
            let features = extractor.extract(&window);
            rows.push(FeatureVector::new(
                window.device_id(),
                window.majority_activity(),
                window.start_timestamp(),
                features,
            ));
        }
    }
    stats.windows = rows.len();

    info!(
        rows = stats.rows,
        devices = stats.devices,
        windows = stats.windows,
        window_size = params.window_size,
        step_size = params.step_size,
        "feature extraction complete"
    );

    let table = FeatureTable::new(layout.schema(), MetadataColumns::from_config(config), rows);
    Ok((table, stats))
}

fn majority_label<'a>(labels: &[&'a str]) -> &'a str {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for &label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn params(window_size: usize, step_size: usize) -> WindowParams {
        WindowParams::new(window_size, step_size).unwrap()
    }

    /// Table with the given (time, device, activity) rows; every sensor
    /// channel carries the row's input index.
    fn table(rows: &[(f64, &str, &str)]) -> SensorTable {
        let config = ExtractorConfig::default();
        let mut table = SensorTable::new()
            .with_column("Time", Column::Float(rows.iter().map(|r| r.0).collect()))
            .unwrap()
            .with_column(
                "Device ID",
                Column::Text(rows.iter().map(|r| r.1.to_string()).collect()),
            )
            .unwrap()
            .with_column(
                "Activity",
                Column::Text(rows.iter().map(|r| r.2.to_string()).collect()),
            )
            .unwrap();
        for name in config.feature_columns() {
            let values = (0..rows.len()).map(|i| i as f64).collect();
            table.push_column(name, Column::Float(values)).unwrap();
        }
        table
    }

    #[test]
    fn test_params_validation() {
        assert!(WindowParams::new(50, 25).is_ok());
        assert_eq!(
            WindowParams::new(0, 25),
            Err(FeatureError::InvalidParameter {
                name: "window_size",
                value: 0
            })
        );
        assert_eq!(
            WindowParams::new(50, 0),
            Err(FeatureError::InvalidParameter {
                name: "step_size",
                value: 0
            })
        );
        assert_eq!(params(50, 25).overlap(), 25);
        assert_eq!(params(10, 20).overlap(), 0);
    }

    #[test]
    fn test_window_count_formula() {
        for n in 0..60 {
            for size in 1..12 {
                for step in 1..12 {
                    let p = params(size, step);
                    let expected = if n >= size { (n - size) / step + 1 } else { 0 };
                    assert_eq!(window_count(n, p), expected, "n={n} size={size} step={step}");
                    assert_eq!(window_offsets(n, p).count(), expected);
                    if let Some(last) = window_offsets(n, p).last() {
                        assert!(last + size <= n);
                    }
                }
            }
        }
    }

    #[test]
    fn test_window_offsets() {
        assert_eq!(window_offsets(100, params(50, 25)).collect::<Vec<_>>(), vec![0, 25, 50]);
        assert_eq!(window_offsets(10, params(4, 10)).collect::<Vec<_>>(), vec![0]);
        assert_eq!(window_offsets(3, params(4, 1)).count(), 0);
    }

    #[test]
    fn test_majority_label_ties_go_to_first_seen() {
        assert_eq!(majority_label(&["walk", "graze", "graze"]), "graze");
        assert_eq!(majority_label(&["walk", "graze", "graze", "walk"]), "walk");
        assert_eq!(majority_label(&["rest", "walk", "graze"]), "rest");
        assert_eq!(majority_label(&[]), "");
    }

    #[test]
    fn test_partition_sorts_and_isolates_devices() {
        let table = table(&[
            (3.0, "B", "walk"),
            (1.0, "A", "graze"),
            (2.0, "B", "walk"),
            (0.0, "A", "graze"),
            (1.0, "B", "rest"),
        ]);
        let config = ExtractorConfig::default();
        let layout = ChannelLayout::resolve(&table, &config).unwrap();
        let devices = DeviceSeries::partition(&table, &config, &layout).unwrap();

        let device = |id: &str| devices.iter().find(|d| d.device_id() == id).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(device("A").timestamps(), &[0.0, 1.0]);
        assert_eq!(device("B").timestamps(), &[1.0, 2.0, 3.0]);

        // Channels hold the input row index, so they reveal the ordering.
        let window = device("B").window(&layout, 0, 3);
        assert_eq!(window.channel(0), &[4.0, 2.0, 0.0]);
        assert_eq!(window.activities(), ["rest", "walk", "walk"]);
        assert_eq!(window.majority_activity(), "walk");
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let table = table(&[
            (5.0, "A", "x"),
            (5.0, "A", "y"),
            (1.0, "A", "z"),
            (5.0, "A", "w"),
        ]);
        let config = ExtractorConfig::default();
        let layout = ChannelLayout::resolve(&table, &config).unwrap();
        let devices = DeviceSeries::partition(&table, &config, &layout).unwrap();
        let window = devices[0].window(&layout, 0, 4);

        assert_eq!(window.activities(), ["z", "x", "y", "w"]);
        assert_eq!(window.channel(0), &[2.0, 0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_window_metadata() {
        let rows: Vec<(f64, &str, &str)> = (0..10)
            .map(|i| (i as f64 * 0.1, "A", if i < 3 { "walk" } else { "graze" }))
            .collect();
        let features = create_windowed_features(
            &table(&rows),
            &ExtractorConfig::default(),
            params(4, 3),
        )
        .unwrap();

        // Offsets 0, 3, 6.
        assert_eq!(features.len(), 3);
        let first = &features.rows()[0];
        assert_eq!(first.device_id, "A");
        assert_eq!(first.activity, "walk");
        assert_eq!(first.timestamp, 0.0);
        assert_eq!(features.rows()[1].activity, "graze");
        assert!((features.rows()[2].timestamp - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_short_device_contributes_nothing() {
        let mut rows: Vec<(f64, &str, &str)> = (0..8).map(|i| (i as f64, "A", "graze")).collect();
        rows.extend((0..3).map(|i| (i as f64, "B", "walk")));

        let (features, stats) =
            extract_with_stats(&table(&rows), &ExtractorConfig::default(), params(4, 2)).unwrap();

        assert_eq!(features.len(), 3);
        assert!(features.rows().iter().all(|r| r.device_id == "A"));
        assert_eq!(stats.devices, 2);
        assert_eq!(stats.devices_without_windows, vec!["B".to_string()]);
        assert_eq!(stats.windows, 3);
    }

    #[test]
    fn test_invalid_params_rejected_before_column_checks() {
        let err = create_windowed_features(
            &SensorTable::new(),
            &ExtractorConfig::default(),
            WindowParams {
                window_size: 10,
                step_size: 0,
            },
        )
        .unwrap_err();

        assert!(matches!(err, FeatureError::InvalidParameter { name: "step_size", .. }));
    }

    #[test]
    fn test_missing_metadata_column() {
        let full = table(&[(0.0, "A", "graze")]);
        let mut stripped = SensorTable::new();
        for name in full.column_names() {
            if name != "Activity" {
                stripped
                    .push_column(name.clone(), full.column(name).unwrap().clone())
                    .unwrap();
            }
        }

        let err = create_windowed_features(&stripped, &ExtractorConfig::default(), params(1, 1))
            .unwrap_err();
        assert_eq!(err, FeatureError::MissingColumn("Activity".to_string()));
    }

    #[test]
    fn test_single_row_windows_do_not_panic() {
        let rows: Vec<(f64, &str, &str)> = (0..3).map(|i| (i as f64, "A", "graze")).collect();
        let features =
            create_windowed_features(&table(&rows), &ExtractorConfig::default(), params(1, 1))
                .unwrap();

        assert_eq!(features.len(), 3);
        let idx = features.column_index("MPU9250_AX_dominant_freq").unwrap();
        assert!(features.rows().iter().all(|r| r.values()[idx] == 0.0));
        let fft_mean = features.column_index("MPU9250_AX_fft_mean").unwrap();
        assert!(features.rows().iter().all(|r| r.values()[fft_mean] == 0.0));
    }
}

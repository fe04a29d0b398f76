//! Feature computation for a single window.
//!
//! Two groups of features are produced: cross-sensor magnitude features and
//! per-axis time/frequency features for the primary IMU. Both are computed
//! from the window's rows only, with nothing carried between windows.
//!
//! The output schema is fixed once per run by [`FeatureSchema`]: the
//! magnitude features always, then every present axis column crossed with
//! [`AxisStat::ALL`].

use crate::config::ExtractorConfig;
use crate::core::spectral::SpectralAnalyzer;
use crate::core::stats::{euclidean_norms, percentile, summary, zero_crossing_rate};
use crate::core::windowing::Window;
use crate::dataset::SensorTable;
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cross-sensor magnitude features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeFeatures {
    /// Mean of the two IMUs' averaged accelerometer magnitude
    pub acc_mag_mean: f64,
    pub acc_mag_std: f64,
    pub acc_mag_min: f64,
    pub acc_mag_max: f64,
    pub acc_mag_range: f64,
    /// Mean primary-IMU gyroscope magnitude
    pub gyro_mag_mean: f64,
    pub gyro_mag_std: f64,
    /// Signal magnitude area: sum of |a| over every primary accelerometer
    /// axis and row
    pub sma: f64,
}

impl MagnitudeFeatures {
    pub const NAMES: [&'static str; 8] = [
        "acc_mag_mean",
        "acc_mag_std",
        "acc_mag_min",
        "acc_mag_max",
        "acc_mag_range",
        "gyro_mag_mean",
        "gyro_mag_std",
        "sma",
    ];

    /// Values in [`MagnitudeFeatures::NAMES`] order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.acc_mag_mean,
            self.acc_mag_std,
            self.acc_mag_min,
            self.acc_mag_max,
            self.acc_mag_range,
            self.gyro_mag_mean,
            self.gyro_mag_std,
            self.sma,
        ]
    }
}

/// One per-axis statistic. The suffix is appended to the axis column name
/// to form the output column, e.g. `MPU9250_AX_q25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisStat {
    Mean,
    Std,
    Min,
    Max,
    Range,
    Q25,
    Q75,
    Iqr,
    Zcr,
    FftMean,
    FftStd,
    DominantFreq,
}

impl AxisStat {
    pub const ALL: [AxisStat; 12] = [
        AxisStat::Mean,
        AxisStat::Std,
        AxisStat::Min,
        AxisStat::Max,
        AxisStat::Range,
        AxisStat::Q25,
        AxisStat::Q75,
        AxisStat::Iqr,
        AxisStat::Zcr,
        AxisStat::FftMean,
        AxisStat::FftStd,
        AxisStat::DominantFreq,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            AxisStat::Mean => "mean",
            AxisStat::Std => "std",
            AxisStat::Min => "min",
            AxisStat::Max => "max",
            AxisStat::Range => "range",
            AxisStat::Q25 => "q25",
            AxisStat::Q75 => "q75",
            AxisStat::Iqr => "iqr",
            AxisStat::Zcr => "zcr",
            AxisStat::FftMean => "fft_mean",
            AxisStat::FftStd => "fft_std",
            AxisStat::DominantFreq => "dominant_freq",
        }
    }

    /// Output column name for this statistic of `axis_column`.
    pub fn column_name(self, axis_column: &str) -> String {
        format!("{axis_column}_{}", self.suffix())
    }
}

/// Time- and frequency-domain features of one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisFeatures {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub q25: f64,
    pub q75: f64,
    pub iqr: f64,
    /// Sign changes per sample
    pub zcr: f64,
    pub fft_mean: f64,
    pub fft_std: f64,
    /// Bin index, not a physical frequency
    pub dominant_freq: usize,
}

impl AxisFeatures {
    pub fn value(&self, stat: AxisStat) -> f64 {
        match stat {
            AxisStat::Mean => self.mean,
            AxisStat::Std => self.std,
            AxisStat::Min => self.min,
            AxisStat::Max => self.max,
            AxisStat::Range => self.range,
            AxisStat::Q25 => self.q25,
            AxisStat::Q75 => self.q75,
            AxisStat::Iqr => self.iqr,
            AxisStat::Zcr => self.zcr,
            AxisStat::FftMean => self.fft_mean,
            AxisStat::FftStd => self.fft_std,
            AxisStat::DominantFreq => self.dominant_freq as f64,
        }
    }
}

/// All computed features for a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowFeatures {
    pub magnitude: MagnitudeFeatures,
    /// One entry per axis column of the run's [`FeatureSchema`]
    pub axes: Vec<AxisFeatures>,
}

impl WindowFeatures {
    /// Flattened values aligned with [`FeatureSchema::names`].
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(
            MagnitudeFeatures::NAMES.len() + self.axes.len() * AxisStat::ALL.len(),
        );
        values.extend(self.magnitude.values());
        for axis in &self.axes {
            values.extend(AxisStat::ALL.iter().map(|&stat| axis.value(stat)));
        }
        values
    }
}

/// The enumerable set of feature columns produced by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    axis_columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(axis_columns: Vec<String>) -> Self {
        Self { axis_columns }
    }

    /// Schema for a table carrying every configured axis column.
    pub fn for_config(config: &ExtractorConfig) -> Self {
        Self::new(config.axis_columns())
    }

    /// Axis columns that receive per-axis features, in output order.
    pub fn axis_columns(&self) -> &[String] {
        &self.axis_columns
    }

    /// Feature column names in output order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = MagnitudeFeatures::NAMES
            .iter()
            .map(|n| n.to_string())
            .collect();
        for axis in &self.axis_columns {
            names.extend(AxisStat::ALL.iter().map(|stat| stat.column_name(axis)));
        }
        names
    }

    /// Number of feature columns.
    pub fn len(&self) -> usize {
        MagnitudeFeatures::NAMES.len() + self.axis_columns.len() * AxisStat::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of a feature column within [`FeatureSchema::names`].
    pub fn position(&self, name: &str) -> Option<usize> {
        if let Some(idx) = MagnitudeFeatures::NAMES.iter().position(|n| *n == name) {
            return Some(idx);
        }
        self.axis_columns.iter().enumerate().find_map(|(axis_idx, axis)| {
            let stat_name = name.strip_prefix(axis.as_str())?.strip_prefix('_')?;
            let stat_idx = AxisStat::ALL.iter().position(|s| s.suffix() == stat_name)?;
            Some(MagnitudeFeatures::NAMES.len() + axis_idx * AxisStat::ALL.len() + stat_idx)
        })
    }
}

/// Where each sensor channel the features need lives in a device series.
///
/// Channels are stored once even when several roles share a column (the
/// primary accelerometer feeds both the magnitude and the per-axis
/// features).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    names: Vec<String>,
    acc_primary: [usize; 3],
    acc_secondary: [usize; 3],
    gyro_primary: [usize; 3],
    axes: Vec<usize>,
}

impl ChannelLayout {
    /// Resolve channels against a table.
    ///
    /// Every [`ExtractorConfig::required_columns`] entry must be present,
    /// otherwise this fails with [`FeatureError::MissingColumn`] naming the
    /// first absent one. Axis channels are optional: an absent one is
    /// skipped and left out of the schema.
    pub fn resolve(table: &SensorTable, config: &ExtractorConfig) -> Result<Self, FeatureError> {
        if let Some(missing) = config
            .required_columns()
            .into_iter()
            .find(|name| !table.has_column(name))
        {
            return Err(FeatureError::MissingColumn(missing));
        }

        let mut names: Vec<String> = Vec::new();
        let mut slot = |name: &str| -> usize {
            match names.iter().position(|n| n == name) {
                Some(idx) => idx,
                None => {
                    names.push(name.to_string());
                    names.len() - 1
                }
            }
        };

        let mut required = |columns: [String; 3]| -> Result<[usize; 3], FeatureError> {
            for name in &columns {
                table.float(name)?;
            }
            Ok(columns.map(|name| slot(&name)))
        };
        let acc_primary = required(ExtractorConfig::accelerometer_columns(&config.primary_imu))?;
        let acc_secondary = required(ExtractorConfig::accelerometer_columns(&config.secondary_imu))?;
        let gyro_primary = required(ExtractorConfig::gyroscope_columns(&config.primary_imu))?;

        let mut axes = Vec::new();
        for name in config.axis_columns() {
            if !table.has_column(&name) {
                debug!(column = %name, "axis column absent, skipping its features");
                continue;
            }
            table.float(&name)?;
            axes.push(slot(&name));
        }

        Ok(Self {
            names,
            acc_primary,
            acc_secondary,
            gyro_primary,
            axes,
        })
    }

    /// Channel column names in slot order.
    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    /// The feature schema this layout produces.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.axes.iter().map(|&slot| self.names[slot].clone()).collect())
    }
}

/// Computes [`WindowFeatures`], reusing FFT plans across windows.
#[derive(Default)]
pub struct FeatureExtractor {
    spectral: SpectralAnalyzer,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute all features from a window.
    pub fn extract(&mut self, window: &Window<'_>) -> WindowFeatures {
        let layout = window.layout();
        let magnitude = compute_magnitude_features(window, layout);
        let axes = layout
            .axes
            .iter()
            .map(|&slot| self.compute_axis_features(window.channel(slot)))
            .collect();

        WindowFeatures { magnitude, axes }
    }

    fn compute_axis_features(&mut self, signal: &[f64]) -> AxisFeatures {
        let time = summary(signal);
        let q25 = percentile(signal, 0.25);
        let q75 = percentile(signal, 0.75);
        let spectrum = self.spectral.analyze(signal);

        AxisFeatures {
            mean: time.mean,
            std: time.std,
            min: time.min,
            max: time.max,
            range: time.range,
            q25,
            q75,
            iqr: q75 - q25,
            zcr: zero_crossing_rate(signal),
            fft_mean: spectrum.fft_mean,
            fft_std: spectrum.fft_std,
            dominant_freq: spectrum.dominant_freq,
        }
    }
}

/// Compute all features from a window with a fresh extractor.
pub fn extract_features(window: &Window<'_>) -> WindowFeatures {
    FeatureExtractor::new().extract(window)
}

fn compute_magnitude_features(window: &Window<'_>, layout: &ChannelLayout) -> MagnitudeFeatures {
    let norms = |[x, y, z]: [usize; 3]| {
        euclidean_norms(window.channel(x), window.channel(y), window.channel(z))
    };

    let primary = norms(layout.acc_primary);
    let secondary = norms(layout.acc_secondary);
    let avg_acc_mag: Vec<f64> = primary
        .iter()
        .zip(&secondary)
        .map(|(a, b)| (a + b) / 2.0)
        .collect();
    let acc = summary(&avg_acc_mag);
    let gyro = summary(&norms(layout.gyro_primary));

    let sma: f64 = layout
        .acc_primary
        .iter()
        .flat_map(|&slot| window.channel(slot))
        .map(|v| v.abs())
        .sum();

    MagnitudeFeatures {
        acc_mag_mean: acc.mean,
        acc_mag_std: acc.std,
        acc_mag_min: acc.min,
        acc_mag_max: acc.max,
        acc_mag_range: acc.range,
        gyro_mag_mean: gyro.mean,
        gyro_mag_std: gyro.std,
        sma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::windowing::DeviceSeries;
    use crate::dataset::Column;

    const ROWS: usize = 8;

    /// A single-device table where every channel is `value(column, row)`.
    fn table_with(value: impl Fn(&str, usize) -> f64, drop: &[&str]) -> SensorTable {
        let config = ExtractorConfig::default();
        let mut table = SensorTable::new()
            .with_column("Time", Column::Float((0..ROWS).map(|i| i as f64).collect()))
            .unwrap()
            .with_column("Device ID", Column::Text(vec!["D1".to_string(); ROWS]))
            .unwrap()
            .with_column("Activity", Column::Text(vec!["grazing".to_string(); ROWS]))
            .unwrap();
        for name in config.feature_columns() {
            if drop.contains(&name.as_str()) {
                continue;
            }
            let values = (0..ROWS).map(|i| value(&name, i)).collect();
            table.push_column(name, Column::Float(values)).unwrap();
        }
        table
    }

    fn features_of(table: &SensorTable) -> WindowFeatures {
        let config = ExtractorConfig::default();
        let layout = ChannelLayout::resolve(table, &config).unwrap();
        let series = DeviceSeries::partition(table, &config, &layout).unwrap();
        let window = series[0].window(&layout, 0, ROWS);
        extract_features(&window)
    }

    #[test]
    fn test_zero_acceleration_gives_zero_magnitudes() {
        let features = features_of(&table_with(|_, _| 0.0, &[]));
        let m = features.magnitude;

        assert_eq!(m.acc_mag_mean, 0.0);
        assert_eq!(m.acc_mag_std, 0.0);
        assert_eq!(m.acc_mag_min, 0.0);
        assert_eq!(m.acc_mag_max, 0.0);
        assert_eq!(m.acc_mag_range, 0.0);
        assert_eq!(m.sma, 0.0);
    }

    #[test]
    fn test_averaged_acceleration_magnitude() {
        // Primary reads (3, 4, 0) -> 5, secondary reads (0, 0, 1) -> 1.
        let table = table_with(
            |name, _| match name {
                "MPU9250_AX" => 3.0,
                "MPU9250_AY" => -4.0,
                "BNO055_AZ" => 1.0,
                _ => 0.0,
            },
            &[],
        );
        let m = features_of(&table).magnitude;

        assert!((m.acc_mag_mean - 3.0).abs() < 1e-12);
        assert!(m.acc_mag_std.abs() < 1e-12);
        assert_eq!(m.acc_mag_range, 0.0);
        assert_eq!(m.sma, 7.0 * ROWS as f64);
    }

    #[test]
    fn test_gyroscope_magnitude() {
        let table = table_with(
            |name, row| match name {
                "MPU9250_GX" => 2.0 * row as f64,
                "BNO055_GX" => 100.0,
                _ => 0.0,
            },
            &[],
        );
        let m = features_of(&table).magnitude;

        // |gx| over rows 0..8 = 0, 2, ..., 14.
        assert!((m.gyro_mag_mean - 7.0).abs() < 1e-12);
        assert!((m.gyro_mag_std - 21.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_axis_features() {
        let table = table_with(
            |name, row| match name {
                "MPU9250_AX" => [1.0, -1.0][row % 2],
                "MPU9250_AY" => row as f64 + 1.0,
                _ => 0.0,
            },
            &[],
        );
        let features = features_of(&table);
        assert_eq!(features.axes.len(), 6);

        let ax = features.axes[0];
        assert!(ax.mean.abs() < 1e-12);
        assert!((ax.std - 1.0).abs() < 1e-12);
        assert_eq!(ax.range, 2.0);
        assert_eq!(ax.zcr, 7.0 / 8.0);
        // Alternating signal puts all energy at the Nyquist bin, which the
        // half spectrum excludes; what remains is zero.
        assert!(ax.fft_mean.abs() < 1e-9);

        let ay = features.axes[1];
        assert!((ay.q25 - 2.75).abs() < 1e-12);
        assert!((ay.q75 - 6.25).abs() < 1e-12);
        assert!((ay.iqr - 3.5).abs() < 1e-12);
        assert_eq!(ay.zcr, 0.0);
        assert_eq!(ay.dominant_freq, 0);
    }

    #[test]
    fn test_absent_axis_is_skipped() {
        let config = ExtractorConfig::default();
        let config = ExtractorConfig {
            axis_suffixes: vec!["AX".into(), "MX".into(), "QQ".into()],
            ..config
        };
        let table = table_with(|_, _| 1.0, &[]);
        let layout = ChannelLayout::resolve(&table, &config).unwrap();

        assert_eq!(
            layout.schema().axis_columns(),
            ["MPU9250_AX", "MPU9250_MX"]
        );
    }

    #[test]
    fn test_missing_magnitude_channel_fails() {
        let table = table_with(|_, _| 1.0, &["BNO055_AY"]);
        let err = ChannelLayout::resolve(&table, &ExtractorConfig::default()).unwrap_err();
        assert_eq!(err, FeatureError::MissingColumn("BNO055_AY".to_string()));
    }

    #[test]
    fn test_required_columns_checked_before_channels() {
        let table = table_with(|_, _| 1.0, &["BNO055_AY"]);
        let mut stripped = SensorTable::new();
        for name in table.column_names() {
            if name != "Time" {
                stripped
                    .push_column(name.clone(), table.column(name).unwrap().clone())
                    .unwrap();
            }
        }

        let err = ChannelLayout::resolve(&stripped, &ExtractorConfig::default()).unwrap_err();
        assert_eq!(err, FeatureError::MissingColumn("Time".to_string()));
    }

    #[test]
    fn test_layout_shares_channels() {
        let table = table_with(|_, _| 1.0, &[]);
        let layout = ChannelLayout::resolve(&table, &ExtractorConfig::default()).unwrap();

        // 3 + 3 + 3 magnitude channels; the six axes reuse the primary ones.
        assert_eq!(layout.channel_names().len(), 9);
        assert_eq!(layout.schema().len(), 8 + 6 * 12);
    }

    #[test]
    fn test_schema_names_and_positions() {
        let schema = FeatureSchema::for_config(&ExtractorConfig::default());
        let names = schema.names();

        assert_eq!(names.len(), schema.len());
        assert_eq!(names[0], "acc_mag_mean");
        assert_eq!(names[7], "sma");
        assert_eq!(names[8], "MPU9250_AX_mean");
        assert_eq!(names.last().unwrap(), "MPU9250_GZ_dominant_freq");
        for (idx, name) in names.iter().enumerate() {
            assert_eq!(schema.position(name), Some(idx), "{name}");
        }
        assert_eq!(schema.position("MPU9250_AX_median"), None);
    }

    #[test]
    fn test_values_align_with_schema() {
        let table = table_with(|name, row| name.len() as f64 + row as f64, &[]);
        let features = features_of(&table);
        let schema = FeatureSchema::for_config(&ExtractorConfig::default());
        let values = features.values();

        assert_eq!(values.len(), schema.len());
        let idx = schema.position("MPU9250_GY_max").unwrap();
        assert_eq!(values[idx], features.axes[4].max);
    }
}

//! Core functionality for grazing feature extraction.
//!
//! This module contains:
//! - Windowing of per-device sensor series
//! - Feature computation for each window (magnitude, time and frequency domain)
//! - The feature table and its export formats

pub mod features;
pub mod output;
pub mod spectral;
pub mod stats;
pub mod windowing;

// Re-export commonly used types
pub use features::{
    extract_features, AxisFeatures, AxisStat, ChannelLayout, FeatureExtractor, FeatureSchema,
    MagnitudeFeatures, WindowFeatures,
};
pub use output::{ExportError, FeatureTable, FeatureVector, MetadataColumns, OutputFormat};
pub use windowing::{
    create_windowed_features, extract_with_stats, window_count, DeviceSeries, ExtractionStats,
    Window, WindowParams,
};

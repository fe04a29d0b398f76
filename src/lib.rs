//! Grazing Features - windowed feature extraction for dual-IMU livestock
//! recordings.
//!
//! Each recording is a CSV of readings from two inertial measurement units
//! worn by one animal while it performs one activity. The recordings are
//! merged, grouped per device, cut into overlapping fixed-size windows and
//! turned into one feature vector per window for activity classifiers.
//!
//! # Guarantees
//!
//! - **Device isolation**: a window never mixes readings from two devices
//! - **Fixed schema**: every run emits the same columns for the same sensor suite
//! - **Determinism**: identical input and parameters give bit-identical output
//! - **Traceability**: every run writes a report of what it read and produced
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Grazing Features                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Dataset   │──▶│  Windowing  │──▶│  Features   │       │
//! │  │ (CSV merge) │   │ (per device)│   │ (compute)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │    Run      │                     │   Feature   │       │
//! │  │   Report    │                     │    Table    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use grazing_features::{combine_datasets, create_windowed_features, ExtractorConfig, WindowParams};
//! use std::path::Path;
//!
//! let config = ExtractorConfig::default();
//! let dataset = combine_datasets(Path::new("data"), &config).expect("failed to load recordings");
//! let params = WindowParams::new(50, 25).expect("invalid window parameters");
//!
//! let features = create_windowed_features(&dataset.table, &config, params)
//!     .expect("feature extraction failed");
//! println!("{} windows", features.len());
//! ```

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod report;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, ExtractorConfig};
pub use self::core::{
    create_windowed_features, extract_features, extract_with_stats, ExtractionStats,
    FeatureSchema, FeatureTable, FeatureVector, OutputFormat, WindowFeatures, WindowParams,
};
pub use dataset::{combine_datasets, AssembledDataset, DatasetError, SensorTable};
pub use error::FeatureError;
pub use report::{ReportStats, RunReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Input side of the pipeline.
//!
//! This module contains:
//! - The column-oriented table the extractor reads from
//! - Assembly of that table from per-recording CSV files

pub mod assembler;
pub mod table;

pub use assembler::{combine_datasets, AssembledDataset, DatasetError};
pub use table::{Column, SensorTable};

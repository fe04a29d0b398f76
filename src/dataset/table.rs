//! Column-oriented, in-memory table of merged sensor readings.
//!
//! One row per reading. Columns are named and keep their insertion order;
//! every column has the same number of rows.

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};

/// A single named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> Column {
        match self {
            Column::Float(values) => Column::Float(indices.iter().map(|&i| values[i]).collect()),
            Column::Text(values) => {
                Column::Text(indices.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

/// The merged recording table handed to the feature extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorTable {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl SensorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`SensorTable::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self, FeatureError> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Add or replace a column.
    ///
    /// The first column fixes the row count; later columns must match it.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), FeatureError> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(FeatureError::LengthMismatch {
                column: name,
                expected: self.rows,
                actual: column.len(),
            });
        }

        self.rows = column.len();
        match self.position(&name) {
            Some(idx) => self.columns[idx] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    /// Borrow a numeric column.
    pub fn float(&self, name: &str) -> Result<&[f64], FeatureError> {
        match self.column(name) {
            Some(Column::Float(values)) => Ok(values),
            Some(Column::Text(_)) => Err(FeatureError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
            }),
            None => Err(FeatureError::MissingColumn(name.to_string())),
        }
    }

    /// Borrow a text column.
    pub fn text(&self, name: &str) -> Result<&[String], FeatureError> {
        match self.column(name) {
            Some(Column::Text(values)) => Ok(values),
            Some(Column::Float(_)) => Err(FeatureError::ColumnType {
                column: name.to_string(),
                expected: "text",
            }),
            None => Err(FeatureError::MissingColumn(name.to_string())),
        }
    }

    /// Build a new table holding only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> SensorTable {
        SensorTable {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            rows: indices.len(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

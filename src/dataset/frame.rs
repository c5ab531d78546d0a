// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use ndarray::Array2;

use super::column::{Column, DataType};
use crate::error::{Error, Result};

/// Columnar table of named float columns of equal length.
///
/// Columns keep their insertion order; lookups are by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    num_rows: usize,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from `(name, column)` pairs.
    pub fn from_columns<S: Into<String>>(columns: impl IntoIterator<Item = (S, Column)>) -> Result<Self> {
        let mut frame = Self::new();
        for (name, column) in columns {
            frame.add_column(name, column)?;
        }
        Ok(frame)
    }

    /// Build a 64-bit frame from a samples x variables array. NaN entries become nulls.
    pub fn from_array2<S: AsRef<str>>(names: &[S], data: Array2<f64>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(Error::ColumnLength {
                name: "names".to_string(),
                expected: data.ncols(),
                found: names.len(),
            });
        }
        let mut frame = Self::new();
        for (name, col) in names.iter().zip(data.columns()) {
            frame.add_column(name.as_ref(), Column::from_nan_f64(col.to_owned()))?;
        }
        Ok(frame)
    }

    /// Append a column. The first column fixes the row count.
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(Error::ColumnLength {
                name,
                expected: self.num_rows,
                found: column.len(),
            });
        }
        self.num_rows = column.len();
        self.index.insert(name.clone(), self.columns.len());
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style [`add_column`](Self::add_column).
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.add_column(name, column)?;
        Ok(self)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index
            .get(name)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Row mask that is true where every listed column is non-null.
    pub fn combined_validity<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<bool>> {
        let mut mask = vec![true; self.num_rows];
        for name in names {
            let column = self.column(name.as_ref())?;
            if let Some(validity) = column.validity() {
                for (m, &v) in mask.iter_mut().zip(validity) {
                    *m &= v;
                }
            }
        }
        Ok(mask)
    }

    /// Number of rows that are non-null in every listed column.
    pub fn valid_rows<S: AsRef<str>>(&self, names: &[S]) -> Result<usize> {
        Ok(self.combined_validity(names)?.iter().filter(|&&m| m).count())
    }

    /// Keep the rows where `mask` is true.
    pub fn select_rows(&self, mask: &[bool]) -> Result<DataFrame> {
        if mask.len() != self.num_rows {
            return Err(Error::ColumnLength {
                name: "row mask".to_string(),
                expected: self.num_rows,
                found: mask.len(),
            });
        }
        Ok(DataFrame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(mask)).collect(),
            index: self.index.clone(),
            num_rows: mask.iter().filter(|&&m| m).count(),
        })
    }

    /// First `n` rows (all rows when `n` exceeds the row count).
    pub fn head(&self, n: usize) -> DataFrame {
        let n = n.min(self.num_rows);
        let mask: Vec<bool> = (0..self.num_rows).map(|i| i < n).collect();
        DataFrame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(&mask)).collect(),
            index: self.index.clone(),
            num_rows: n,
        }
    }

    /// Copy with every column cast to `data_type`.
    pub fn cast(&self, data_type: DataType) -> DataFrame {
        DataFrame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.cast(data_type)).collect(),
            index: self.index.clone(),
            num_rows: self.num_rows,
        }
    }

    pub fn to_float32(&self) -> DataFrame {
        self.cast(DataType::Float32)
    }

    pub fn to_float64(&self) -> DataFrame {
        self.cast(DataType::Float64)
    }
}

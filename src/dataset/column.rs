// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use ndarray::Array1;

use crate::error::{Error, Result};

/// Float width of a column. Fixed for a factor at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float32,
    Float64,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Float32 => write!(f, "float32"),
            DataType::Float64 => write!(f, "float64"),
        }
    }
}

/// Typed values of a column.
///
/// Also used as the host-side representation of kernel centers and query
/// batches handed to a compute backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float32(Array1<f32>),
    Float64(Array1<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Float32(_) => DataType::Float32,
            ColumnData::Float64(_) => DataType::Float64,
        }
    }

    /// Keep the entries where `mask` is true, preserving order.
    pub fn filter(&self, mask: &[bool]) -> ColumnData {
        fn keep<T: Copy>(values: &Array1<T>, mask: &[bool]) -> Array1<T> {
            values
                .iter()
                .zip(mask)
                .filter_map(|(&v, &m)| m.then_some(v))
                .collect()
        }
        match self {
            ColumnData::Float32(v) => ColumnData::Float32(keep(v, mask)),
            ColumnData::Float64(v) => ColumnData::Float64(keep(v, mask)),
        }
    }

    /// Values widened to `f64`.
    pub fn to_f64(&self) -> Array1<f64> {
        match self {
            ColumnData::Float32(v) => v.mapv(f64::from),
            ColumnData::Float64(v) => v.clone(),
        }
    }
}

impl From<Array1<f64>> for ColumnData {
    fn from(array: Array1<f64>) -> Self {
        ColumnData::Float64(array)
    }
}

impl From<Array1<f32>> for ColumnData {
    fn from(array: Array1<f32>) -> Self {
        ColumnData::Float32(array)
    }
}

/// A typed float column with an optional validity bitmap.
///
/// `validity[i] == false` marks row `i` as null. A missing bitmap means every
/// row is valid. The value stored at a null position is unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    data: ColumnData,
    validity: Option<Vec<bool>>,
}

impl Column {
    /// Column without nulls.
    pub fn new(data: impl Into<ColumnData>) -> Self {
        Self { data: data.into(), validity: None }
    }

    /// Column with an explicit validity bitmap.
    pub fn with_validity(data: impl Into<ColumnData>, validity: Vec<bool>) -> Result<Self> {
        let data = data.into();
        if validity.len() != data.len() {
            return Err(Error::ColumnLength {
                name: "validity".to_string(),
                expected: data.len(),
                found: validity.len(),
            });
        }
        let validity = if validity.iter().all(|&v| v) { None } else { Some(validity) };
        Ok(Self { data, validity })
    }

    /// 64-bit column where NaN entries become nulls.
    pub fn from_nan_f64(values: Array1<f64>) -> Self {
        let validity: Vec<bool> = values.iter().map(|v| !v.is_nan()).collect();
        // Lengths agree by construction.
        let has_nulls = validity.iter().any(|&v| !v);
        Self {
            data: ColumnData::Float64(values),
            validity: has_nulls.then_some(validity),
        }
    }

    /// 32-bit column where NaN entries become nulls.
    pub fn from_nan_f32(values: Array1<f32>) -> Self {
        let validity: Vec<bool> = values.iter().map(|v| !v.is_nan()).collect();
        let has_nulls = validity.iter().any(|&v| !v);
        Self {
            data: ColumnData::Float32(values),
            validity: has_nulls.then_some(validity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn validity(&self) -> Option<&[bool]> {
        self.validity.as_deref()
    }

    /// Whether `row` holds a value. Rows past the end are never valid.
    pub fn is_valid(&self, row: usize) -> bool {
        row < self.len() && self.validity.as_ref().is_none_or(|v| v[row])
    }

    pub fn null_count(&self) -> usize {
        self.validity
            .as_ref()
            .map_or(0, |v| v.iter().filter(|&&valid| !valid).count())
    }

    /// Validity as an owned mask, all `true` when the column has no nulls.
    pub fn validity_mask(&self) -> Vec<bool> {
        self.validity.clone().unwrap_or_else(|| vec![true; self.len()])
    }

    /// Non-null values only, in row order.
    pub fn non_null(&self) -> ColumnData {
        match &self.validity {
            Some(mask) => self.data.filter(mask),
            None => self.data.clone(),
        }
    }

    /// All rows, with nulls replaced by NaN.
    pub fn values_or_nan(&self) -> ColumnData {
        let Some(mask) = &self.validity else {
            return self.data.clone();
        };
        match &self.data {
            ColumnData::Float32(v) => ColumnData::Float32(
                v.iter().zip(mask).map(|(&x, &m)| if m { x } else { f32::NAN }).collect(),
            ),
            ColumnData::Float64(v) => ColumnData::Float64(
                v.iter().zip(mask).map(|(&x, &m)| if m { x } else { f64::NAN }).collect(),
            ),
        }
    }

    /// Same rows cast to `data_type`; nulls are preserved.
    pub fn cast(&self, data_type: DataType) -> Column {
        let data = match (&self.data, data_type) {
            (ColumnData::Float64(v), DataType::Float32) => ColumnData::Float32(v.mapv(|x| x as f32)),
            (ColumnData::Float32(v), DataType::Float64) => ColumnData::Float64(v.mapv(f64::from)),
            (data, _) => data.clone(),
        };
        Column { data, validity: self.validity.clone() }
    }

    /// Rows where `mask` is true.
    pub(crate) fn select(&self, mask: &[bool]) -> Column {
        Column {
            data: self.data.filter(mask),
            validity: self.validity.as_ref().map(|v| {
                v.iter().zip(mask).filter_map(|(&valid, &m)| m.then_some(valid)).collect()
            }),
        }
    }
}

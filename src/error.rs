// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error type shared by datasets, bandwidth estimators, backends and factors.

use crate::dataset::DataType;

/// Errors reported by the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation that needs a fitted factor was called before `fit`.
    #[error("factor not fitted")]
    NotFitted,

    /// The evaluation dataset uses a different float width than the training dataset.
    #[error(
        "data type of training and test datasets is different: fitted with {expected}, got {found}"
    )]
    DataTypeMismatch {
        /// Width recorded at fit time.
        expected: DataType,
        /// Width found in the evaluation dataset.
        found: DataType,
    },

    /// A factor was constructed without variables.
    #[error("a factor needs at least one variable")]
    EmptyVariables,

    /// A variable name appears more than once in a variable set.
    #[error("variable '{0}' appears more than once")]
    DuplicateVariable(String),

    /// A required column is not present in the dataset.
    #[error("column '{0}' not found in dataset")]
    MissingColumn(String),

    /// A column with this name was already added to the dataset.
    #[error("column '{0}' already exists in dataset")]
    DuplicateColumn(String),

    /// The variables of a factor do not share one float width.
    #[error("column '{column}' is {found}, but other variables are {expected}")]
    MixedDataTypes {
        /// The offending column.
        column: String,
        /// Width of the first variable.
        expected: DataType,
        /// Width of the offending column.
        found: DataType,
    },

    /// A column, validity bitmap or row mask has the wrong length.
    #[error("length mismatch for '{name}': expected {expected} rows, got {found}")]
    ColumnLength {
        /// Column or mask name.
        name: String,
        /// Expected number of rows.
        expected: usize,
        /// Actual number of rows.
        found: usize,
    },

    /// A bandwidth vector does not have one entry per variable.
    #[error("bandwidth has {found} entries, expected {expected}")]
    BandwidthLength {
        /// Number of variables.
        expected: usize,
        /// Number of supplied bandwidths.
        found: usize,
    },

    /// A bandwidth is not a finite positive number.
    #[error("invalid bandwidth {value} for variable '{variable}': must be finite and positive")]
    InvalidBandwidth {
        /// Variable the bandwidth belongs to.
        variable: String,
        /// Supplied value.
        value: f64,
    },

    /// The factor has no kernel centers to draw from.
    #[error("factor was fitted on zero jointly-complete rows")]
    EmptyTrainingSample,

    /// The compute device failed.
    #[error("compute backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Product kernel density estimation
//!
//! A [`ProductKde`] models the joint density of `d` continuous variables as the
//! product of `d` independent univariate Gaussian KDEs:
//!
//! p̂(x) = ∏_i (1/N) ∑_j φ((x_i - c_{i,j}) / h_i) / h_i
//!
//! where `c_{i,j}` is the `j`-th kernel center of variable `i`, `h_i` its
//! bandwidth and `φ` the standard normal density. In log space the product
//! becomes a sum over dimensions, and each dimension is an independent batched
//! reduction run by the factor's [`ComputeBackend`].
//!
//! ## Missing data
//!
//! Fitting makes two passes over the dataset:
//!
//! 1. Each variable's bandwidth is estimated from *that variable's* non-null
//!    values, regardless of nulls in the other variables.
//! 2. Kernel centers are kept only for rows that are non-null in *every*
//!    variable, so all dimensions share the same `N`.
//!
//! A bandwidth may therefore come from more observations than
//! [`num_instances`](ProductKde::num_instances) reports.
//!
//! During evaluation, a row with a null in any variable gets a NaN
//! log-density and is skipped by [`slogl`](ProductKde::slogl).
//!
//! ## Degenerate fits
//!
//! Fitting on data without any jointly-complete row succeeds, but the factor
//! has no kernel centers: [`logl`](ProductKde::logl) returns NaN for every row
//! and [`slogl`](ProductKde::slogl) returns NaN.
//!
//! A variable with fewer than two non-null values gets a NaN bandwidth from the
//! built-in estimators. Every row then evaluates to NaN, and so does `slogl`,
//! until a valid bandwidth is supplied with
//! [`set_bandwidth`](ProductKde::set_bandwidth).
//!
//! ## Order invariance
//!
//! Variables are matched to bandwidths, centers and query columns by name, and
//! per-dimension contributions are added in name order. Two factors whose
//! variable sets are permutations of each other produce identical results.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use super::bandwidth::{BandwidthEstimator, NormalReferenceRule};
use crate::backend::{ComputeBackend, ResidentCenters, default_backend};
use crate::dataset::{Column, ColumnData, DataFrame, DataType};
use crate::error::{Error, Result};
use crate::factors::traits::{Factor, nan_sum};

/// Kernel centers of one variable, on the host and in backend memory.
#[derive(Debug)]
struct Dimension {
    centers: ColumnData,
    resident: Box<dyn ResidentCenters>,
}

#[derive(Debug)]
struct FittedState {
    data_type: DataType,
    num_instances: usize,
    /// One entry per variable, in variable-set order.
    dimensions: Vec<Dimension>,
}

/// Product of univariate Gaussian kernel density estimators.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use pgm_factors::dataset::{Column, DataFrame};
/// use pgm_factors::factors::continuous::ProductKde;
///
/// let df = DataFrame::new()
///     .with_column("a", Column::new(array![0.1, 0.7, -0.4, 1.3, 0.2])).unwrap()
///     .with_column("b", Column::new(array![2.0, 1.4, 2.6, 1.9, 2.2])).unwrap();
///
/// let mut kde = ProductKde::new(&["a", "b"]).unwrap();
/// kde.fit(&df).unwrap();
///
/// assert_eq!(kde.num_instances(), 5);
/// let logl = kde.logl(&df).unwrap();
/// assert_eq!(logl.len(), 5);
/// ```
#[derive(Debug)]
pub struct ProductKde {
    variables: Vec<String>,
    /// Variable indices sorted by name; the order contributions are summed in.
    reduction_order: Vec<usize>,
    estimator: Arc<dyn BandwidthEstimator>,
    backend: Arc<dyn ComputeBackend>,
    bandwidth: Array1<f64>,
    state: Option<FittedState>,
}

impl ProductKde {
    /// Creates an unfitted factor using the normal reference rule.
    ///
    /// # Errors
    ///
    /// `EmptyVariables` for an empty set, `DuplicateVariable` when a name repeats.
    pub fn new<S: AsRef<str>>(variables: &[S]) -> Result<Self> {
        Self::with_estimator(variables, Arc::new(NormalReferenceRule))
    }

    /// Creates an unfitted factor with a custom bandwidth estimator.
    pub fn with_estimator<S: AsRef<str>>(
        variables: &[S],
        estimator: Arc<dyn BandwidthEstimator>,
    ) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::EmptyVariables);
        }
        let variables: Vec<String> = variables.iter().map(|v| v.as_ref().to_string()).collect();
        let mut seen = HashSet::with_capacity(variables.len());
        for v in &variables {
            if !seen.insert(v.as_str()) {
                return Err(Error::DuplicateVariable(v.clone()));
            }
        }

        let mut reduction_order: Vec<usize> = (0..variables.len()).collect();
        reduction_order.sort_by(|&a, &b| variables[a].cmp(&variables[b]));

        Ok(Self {
            variables,
            reduction_order,
            estimator,
            backend: default_backend(),
            bandwidth: Array1::zeros(0),
            state: None,
        })
    }

    /// Evaluate kernels on `backend` instead of the process default.
    ///
    /// Any fitted state is discarded, since it lives in the old backend's memory.
    pub fn with_backend(mut self, backend: Arc<dyn ComputeBackend>) -> Self {
        self.state = None;
        self.backend = backend;
        self
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of kernel centers (jointly-complete training rows). Zero when unfitted.
    pub fn num_instances(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.num_instances)
    }

    pub fn fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Float width of the training data.
    pub fn data_type(&self) -> Result<DataType> {
        self.state.as_ref().map(|s| s.data_type).ok_or(Error::NotFitted)
    }

    pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    /// Per-variable bandwidths (standard deviations), in variable-set order.
    pub fn bandwidth(&self) -> &Array1<f64> {
        &self.bandwidth
    }

    /// Override the bandwidths. Subsequent evaluations use these values exactly.
    ///
    /// A later [`fit`](Self::fit) replaces them with fresh estimates.
    pub fn set_bandwidth(&mut self, bandwidth: Array1<f64>) -> Result<()> {
        if bandwidth.len() != self.variables.len() {
            return Err(Error::BandwidthLength {
                expected: self.variables.len(),
                found: bandwidth.len(),
            });
        }
        for (variable, &value) in self.variables.iter().zip(bandwidth.iter()) {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidBandwidth { variable: variable.clone(), value });
            }
        }
        self.bandwidth = bandwidth;
        Ok(())
    }

    /// Fit bandwidths and kernel centers to `df`. Extra columns are ignored.
    ///
    /// # Errors
    ///
    /// `MissingColumn` when a variable is absent, `MixedDataTypes` when the
    /// variables do not share one float width, `Backend` when the centers cannot
    /// be uploaded. On error the factor is left unfitted.
    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        // Release the previous fit, including its device buffers, before anything can fail.
        self.state = None;
        self.bandwidth = Array1::zeros(0);

        let data_type = self.training_data_type(df)?;

        // Pass 1: each bandwidth from its own variable's non-null values.
        let mut bandwidth = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            let values = df.column(variable)?.non_null().to_f64();
            let bw = self.estimator.estimate_univariate(variable, values.view());
            if !(bw.is_finite() && bw > 0.0) {
                tracing::warn!(
                    variable = %variable,
                    bandwidth = bw,
                    observations = values.len(),
                    "estimated bandwidth is not a positive finite number"
                );
            }
            bandwidth.push(bw);
        }

        // Pass 2: kernel centers from rows complete in every variable.
        let complete = df.combined_validity(&self.variables)?;
        let num_instances = complete.iter().filter(|&&c| c).count();

        let dimensions = self
            .variables
            .iter()
            .map(|variable| -> Result<Dimension> {
                let centers = df.column(variable)?.data().filter(&complete);
                let resident = self.backend.upload(&centers)?;
                Ok(Dimension { centers, resident })
            })
            .collect::<Result<Vec<_>>>()?;

        if num_instances == 0 {
            tracing::warn!(
                factor = %self,
                rows = df.num_rows(),
                "no jointly-complete rows, evaluations will be NaN"
            );
        }
        tracing::debug!(
            factor = %self,
            instances = num_instances,
            rows = df.num_rows(),
            data_type = %data_type,
            backend = self.backend.name(),
            "fitted product KDE"
        );

        self.bandwidth = Array1::from_vec(bandwidth);
        self.state = Some(FittedState { data_type, num_instances, dimensions });
        Ok(())
    }

    /// Log-density of every row of `df`.
    ///
    /// Rows with a null in any variable give NaN.
    ///
    /// # Errors
    ///
    /// `NotFitted`, `MissingColumn`, or `DataTypeMismatch` when a column's
    /// width differs from the training width.
    pub fn logl(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or(Error::NotFitted)?;
        let queries = self.query_columns(df, state.data_type)?;
        let complete = df.combined_validity(&self.variables)?;

        if state.num_instances == 0 {
            return Ok(Array1::from_elem(df.num_rows(), f64::NAN));
        }

        // Fan out one batched evaluation per dimension, then join.
        let contributions = (0..self.variables.len())
            .into_par_iter()
            .map(|i| state.dimensions[i].resident.log_density(&queries[i], self.bandwidth[i]))
            .collect::<Result<Vec<_>>>()?;

        let mut logl = Array1::<f64>::zeros(df.num_rows());
        for &i in &self.reduction_order {
            logl += &contributions[i];
        }
        for (value, &ok) in logl.iter_mut().zip(&complete) {
            if !ok {
                *value = f64::NAN;
            }
        }
        Ok(logl)
    }

    /// Sum of [`logl`](Self::logl) over the rows without nulls.
    ///
    /// NaN when the factor was fitted without any jointly-complete row, or when
    /// a bandwidth is not a positive finite number.
    pub fn slogl(&self, df: &DataFrame) -> Result<f64> {
        let logl = self.logl(df)?;
        if self.num_instances() == 0 || !self.bandwidth.iter().all(|&h| h.is_finite() && h > 0.0) {
            return Ok(f64::NAN);
        }
        Ok(nan_sum(&logl))
    }

    /// Draw `n` rows from the fitted density.
    ///
    /// Each row picks one training row uniformly and adds independent Gaussian
    /// noise with the variable's bandwidth to every coordinate. The result has the
    /// training width and one column per variable.
    pub fn sample(&self, n: usize, seed: u64) -> Result<DataFrame> {
        let state = self.state.as_ref().ok_or(Error::NotFitted)?;
        if state.num_instances == 0 {
            return Err(Error::EmptyTrainingSample);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..state.num_instances)).collect();

        let mut out = DataFrame::new();
        for (i, variable) in self.variables.iter().enumerate() {
            let bw = self.bandwidth[i];
            let noise = Normal::new(0.0, bw)
                .map_err(|_| Error::InvalidBandwidth { variable: variable.clone(), value: bw })?;
            let column = match &state.dimensions[i].centers {
                ColumnData::Float64(c) => Column::new(
                    rows.iter()
                        .map(|&r| c[r] + noise.sample(&mut rng))
                        .collect::<Array1<f64>>(),
                ),
                ColumnData::Float32(c) => Column::new(
                    rows.iter()
                        .map(|&r| c[r] + noise.sample(&mut rng) as f32)
                        .collect::<Array1<f32>>(),
                ),
            };
            out.add_column(variable.as_str(), column)?;
        }
        Ok(out)
    }

    /// Width shared by every variable column of a training dataset.
    fn training_data_type(&self, df: &DataFrame) -> Result<DataType> {
        let expected = df.column(&self.variables[0])?.data_type();
        for variable in &self.variables[1..] {
            let found = df.column(variable)?.data_type();
            if found != expected {
                return Err(Error::MixedDataTypes { column: variable.clone(), expected, found });
            }
        }
        Ok(expected)
    }

    /// Query values per variable (nulls as NaN), checked against the training width.
    fn query_columns(&self, df: &DataFrame, expected: DataType) -> Result<Vec<ColumnData>> {
        self.variables
            .iter()
            .map(|variable| -> Result<ColumnData> {
                let column = df.column(variable)?;
                if column.data_type() != expected {
                    return Err(Error::DataTypeMismatch { expected, found: column.data_type() });
                }
                Ok(column.values_or_nan())
            })
            .collect()
    }
}

impl fmt::Display for ProductKde {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ProductKDE] {}", self.variables.join(", "))
    }
}

impl Factor for ProductKde {
    fn variables(&self) -> &[String] {
        ProductKde::variables(self)
    }

    fn fitted(&self) -> bool {
        ProductKde::fitted(self)
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        ProductKde::fit(self, df)
    }

    fn logl(&self, df: &DataFrame) -> Result<Array1<f64>> {
        ProductKde::logl(self, df)
    }

    fn slogl(&self, df: &DataFrame) -> Result<f64> {
        ProductKde::slogl(self, df)
    }

    fn sample(&self, n: usize, seed: u64) -> Result<DataFrame> {
        ProductKde::sample(self, n, seed)
    }
}

// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

// Host implementation of the per-dimension Gaussian log-density reduction

use ndarray::Array1;
use rayon::prelude::*;

use super::{ComputeBackend, KdeFloat, ResidentCenters};
use crate::dataset::{ColumnData, DataType};
use crate::error::{Error, Result};

/// Evaluates kernels in host memory, one rayon task per query row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn upload(&self, centers: &ColumnData) -> Result<Box<dyn ResidentCenters>> {
        let resident: Box<dyn ResidentCenters> = match centers {
            ColumnData::Float32(v) => Box::new(HostCenters { centers: v.to_vec() }),
            ColumnData::Float64(v) => Box::new(HostCenters { centers: v.to_vec() }),
        };
        Ok(resident)
    }
}

/// Kernel centers held in host memory.
#[derive(Debug)]
pub(crate) struct HostCenters<T> {
    pub(crate) centers: Vec<T>,
}

impl<T: HostFloat> ResidentCenters for HostCenters<T> {
    fn len(&self) -> usize {
        self.centers.len()
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn log_density(&self, queries: &ColumnData, bandwidth: f64) -> Result<Array1<f64>> {
        let queries = T::values(queries).ok_or(Error::DataTypeMismatch {
            expected: T::DATA_TYPE,
            found: queries.data_type(),
        })?;
        let queries = queries.to_vec();
        Ok(gaussian_log_density(&self.centers, &queries, T::from_f64(bandwidth)))
    }
}

/// Access to the typed array inside a [`ColumnData`].
pub(crate) trait HostFloat: KdeFloat {
    fn values(data: &ColumnData) -> Option<&Array1<Self>>;
}

impl HostFloat for f32 {
    fn values(data: &ColumnData) -> Option<&Array1<f32>> {
        match data {
            ColumnData::Float32(v) => Some(v),
            ColumnData::Float64(_) => None,
        }
    }
}

impl HostFloat for f64 {
    fn values(data: &ColumnData) -> Option<&Array1<f64>> {
        match data {
            ColumnData::Float64(v) => Some(v),
            ColumnData::Float32(_) => None,
        }
    }
}

/// Per-query log-density of a univariate Gaussian KDE.
///
/// Computes `log((1/N) ∑_j exp(-(x - c_j)² / (2h²))) - log(√(2π) h)` in the
/// width `T`, factoring out the largest exponent before summing. Each query is
/// reduced sequentially over the centers, so results do not depend on how rows
/// are scheduled across threads.
///
/// NaN queries give NaN. Without centers, or with a bandwidth that is not a
/// positive finite number, every query gives NaN.
pub fn gaussian_log_density<T: KdeFloat>(centers: &[T], queries: &[T], bandwidth: T) -> Array1<f64> {
    let n = centers.len();
    if n == 0 || !(bandwidth.is_finite() && bandwidth > T::zero()) {
        return Array1::from_elem(queries.len(), f64::NAN);
    }

    let two = T::one() + T::one();
    let two_h2 = two * bandwidth * bandwidth;
    // log(N) + log(√(2π) h)
    let log_norm = T::from_f64((n as f64).ln()) + ((two * T::PI()).sqrt() * bandwidth).ln();

    let out: Vec<f64> = queries
        .par_iter()
        .map(|&x| {
            if x.is_nan() {
                return f64::NAN;
            }

            let mut max = T::neg_infinity();
            for &c in centers {
                let d = x - c;
                let e = -(d * d) / two_h2;
                if e > max {
                    max = e;
                }
            }
            if max == T::neg_infinity() {
                // Every kernel underflows exactly: zero density.
                return f64::NEG_INFINITY;
            }

            let mut sum = T::zero();
            for &c in centers {
                let d = x - c;
                sum = sum + (-(d * d) / two_h2 - max).exp();
            }

            (max + sum.ln() - log_norm).into_f64()
        })
        .collect();

    Array1::from_vec(out)
}

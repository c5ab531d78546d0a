// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Bandwidth selection
//!
//! A [`BandwidthEstimator`] turns a sample into the scale of a Gaussian kernel.
//! Univariate estimates are standard deviations, used by the product KDE once per
//! dimension. Multivariate estimates are bandwidth covariance matrices, for
//! factors that place full-covariance kernels on jointly observed rows.
//!
//! Both built-in rules scale the sample spread by a power of the sample size.
//! With `n` observations in `d` dimensions and sample covariance `Σ` (divisor
//! `n - 1`):
//!
//! - [`NormalReferenceRule`]: `H = ((4 / (d + 2))^(1/(d+4)) · n^(-1/(d+4)))² · Σ`
//! - [`ScottsBandwidth`]: `H = (n^(-1/(d+4)))² · Σ`
//!
//! For `d = 1` the univariate estimate is `sqrt(H)`, so the normal reference
//! rule gives `(4/3)^(1/5) · n^(-1/5) · σ` and Scott's rule `n^(-1/5) · σ`.

use std::fmt::Debug;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Strategy computing kernel bandwidths from data.
pub trait BandwidthEstimator: Send + Sync + Debug {
    /// Bandwidth (a standard deviation) for one variable.
    ///
    /// `values` are the variable's non-null observations.
    fn estimate_univariate(&self, variable: &str, values: ArrayView1<'_, f64>) -> f64;

    /// Bandwidth covariance matrix for several variables.
    ///
    /// `rows` holds jointly observed samples, one row per sample and one column
    /// per entry of `variables`.
    fn estimate_multivariate(&self, variables: &[String], rows: ArrayView2<'_, f64>) -> Array2<f64>;
}

/// Normal reference rule (Silverman's refinement of Scott's factor). The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalReferenceRule;

/// Scott's rule of thumb, without the normal-efficiency correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScottsBandwidth;

impl NormalReferenceRule {
    /// Scale factor applied to the standard deviation for `n` samples in `d` dimensions.
    pub fn factor(n: usize, d: usize) -> f64 {
        let d = d as f64;
        (4.0 / (d + 2.0)).powf(1.0 / (d + 4.0)) * (n as f64).powf(-1.0 / (d + 4.0))
    }
}

impl ScottsBandwidth {
    pub fn factor(n: usize, d: usize) -> f64 {
        (n as f64).powf(-1.0 / (d as f64 + 4.0))
    }
}

impl BandwidthEstimator for NormalReferenceRule {
    fn estimate_univariate(&self, _variable: &str, values: ArrayView1<'_, f64>) -> f64 {
        Self::factor(values.len(), 1) * sample_std(values)
    }

    fn estimate_multivariate(&self, variables: &[String], rows: ArrayView2<'_, f64>) -> Array2<f64> {
        let factor = Self::factor(rows.nrows(), variables.len());
        sample_covariance(rows) * (factor * factor)
    }
}

impl BandwidthEstimator for ScottsBandwidth {
    fn estimate_univariate(&self, _variable: &str, values: ArrayView1<'_, f64>) -> f64 {
        Self::factor(values.len(), 1) * sample_std(values)
    }

    fn estimate_multivariate(&self, variables: &[String], rows: ArrayView2<'_, f64>) -> Array2<f64> {
        let factor = Self::factor(rows.nrows(), variables.len());
        sample_covariance(rows) * (factor * factor)
    }
}

/// Sample standard deviation with divisor `n - 1`. NaN for fewer than two values.
pub fn sample_std(values: ArrayView1<'_, f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.sum() / n as f64;
    let ss = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>();
    (ss / (n - 1) as f64).sqrt()
}

/// Unbiased sample covariance of the columns of `rows`. NaN-filled for fewer than two rows.
pub fn sample_covariance(rows: ArrayView2<'_, f64>) -> Array2<f64> {
    let (n, d) = rows.dim();
    if n < 2 {
        return Array2::from_elem((d, d), f64::NAN);
    }
    let Some(mean) = rows.mean_axis(Axis(0)) else {
        return Array2::from_elem((d, d), f64::NAN);
    };
    let centered = &rows - &mean.insert_axis(Axis(0));
    centered.t().dot(&centered) / (n - 1) as f64
}

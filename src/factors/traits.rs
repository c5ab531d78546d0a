// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

use ndarray::Array1;

use crate::dataset::DataFrame;
use crate::error::Result;

/// Common surface of probability factors, as consumed by structure-learning scores.
pub trait Factor: Display {
    /// Variables the factor is defined over, in construction order.
    fn variables(&self) -> &[String];

    fn fitted(&self) -> bool;

    /// Learn the factor's parameters from `df`, replacing any previous fit.
    fn fit(&mut self, df: &DataFrame) -> Result<()>;

    /// Log-density of every row of `df`. Rows with missing values give NaN.
    fn logl(&self, df: &DataFrame) -> Result<Array1<f64>>;

    /// Sum of the log-densities of `df`, skipping rows with missing values.
    fn slogl(&self, df: &DataFrame) -> Result<f64> {
        Ok(nan_sum(&self.logl(df)?))
    }

    /// Draw `n` rows from the fitted density.
    fn sample(&self, n: usize, seed: u64) -> Result<DataFrame>;
}

/// Sum of the non-NaN entries.
pub fn nan_sum(values: &Array1<f64>) -> f64 {
    values.iter().filter(|v| !v.is_nan()).sum()
}

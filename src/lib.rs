// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # pgm-factors
//!
//! Continuous probability factors for probabilistic graphical models, built
//! around a product kernel density estimator that structure-learning scores
//! can fit and evaluate on columnar data with missing values.
//!
//! ## Quick Start
//!
//! ```rust
//! use pgm_factors::dataset::{Column, DataFrame};
//! use pgm_factors::factors::continuous::{ProductKde, ScottsBandwidth};
//! use ndarray::array;
//! use std::sync::Arc;
//!
//! let train = DataFrame::new()
//!     .with_column("x", Column::from_nan_f64(array![0.3, 1.2, f64::NAN, -0.5, 0.9])).unwrap()
//!     .with_column("y", Column::new(array![1.0, 2.1, 1.7, 0.4, 1.1])).unwrap();
//!
//! // Normal reference rule by default, or choose another estimator
//! let mut kde = ProductKde::with_estimator(&["x", "y"], Arc::new(ScottsBandwidth)).unwrap();
//! kde.fit(&train).unwrap();
//!
//! assert_eq!(kde.num_instances(), 4); // row 2 is missing `x`
//! let logl = kde.logl(&train).unwrap();
//! assert!(logl[2].is_nan());
//! let total = kde.slogl(&train).unwrap(); // skips row 2
//! assert!(total.is_finite());
//! ```
//!
//! ## Architecture
//!
//! 1. **Dataset**: named float columns (32 or 64 bit) with null bitmaps
//! 2. **Bandwidth estimators**: normal reference rule, Scott's rule, or any
//!    [`BandwidthEstimator`](factors::continuous::BandwidthEstimator)
//! 3. **Factors**: [`ProductKde`](factors::continuous::ProductKde) and the
//!    [`Factor`](factors::Factor) trait
//! 4. **Compute backends**: host evaluation with rayon, optional wgpu evaluation
//!
//! ## Feature Flags
//!
//! - `gpu_support`: enable the wgpu [`GpuBackend`](backend::GpuBackend)
//!
//! ## Configuration
//!
//! Factors built without an explicit backend use
//! [`default_backend`](backend::default_backend), selected by the
//! `PGM_FACTORS_BACKEND` environment variable (`cpu` or `gpu`).

pub mod backend;
pub mod dataset;
pub mod error;
pub mod factors;

pub use error::{Error, Result};

// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Compute backends for batched kernel evaluation
//!
//! A backend owns the memory that holds a factor's kernel centers and runs the
//! per-dimension log-density reduction over them. The factor only talks to the
//! two traits below, so the evaluation algorithm is the same whether the
//! centers live in host memory or on a GPU.
//!
//! For one dimension with centers `c_1..c_N` and bandwidth `h`, a query `x`
//! contributes
//!
//! log( (1/N) ∑ exp(-(x - c_j)² / (2h²)) ) - log(√(2π) h)
//!
//! The sum is evaluated with the log-sum-exp trick: the largest exponent is
//! factored out before exponentiating, so queries far away from every center
//! still produce finite log-densities.
//!
//! ## Backends
//!
//! - [`CpuBackend`]: always available, runs in the width of the training data
//!   and spreads query rows over the rayon thread pool.
//! - `GpuBackend`: available with the `gpu_support` feature. Evaluates 32-bit
//!   centers in a WGSL compute shader and hands 64-bit centers to the host
//!   implementation.

use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use ndarray::Array1;
use num_traits::{Float, FloatConst};

use crate::dataset::{ColumnData, DataType};
use crate::error::Result;

pub mod cpu;
#[cfg(feature = "gpu_support")]
pub mod gpu;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu_support")]
pub use gpu::GpuBackend;

/// Allocates backend memory for kernel centers.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Short identifier used in log output.
    fn name(&self) -> &'static str;

    /// Copy one dimension's kernel centers into backend memory.
    ///
    /// The returned handle owns the allocation; dropping it releases it.
    fn upload(&self, centers: &ColumnData) -> Result<Box<dyn ResidentCenters>>;
}

/// Kernel centers of one dimension, resident in backend memory.
pub trait ResidentCenters: Send + Sync + Debug {
    /// Number of kernel centers.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_type(&self) -> DataType;

    /// Log-density contribution of this dimension for every query value.
    ///
    /// `queries` must have the same width as the centers. NaN queries yield
    /// NaN. With no centers every contribution is NaN.
    fn log_density(&self, queries: &ColumnData, bandwidth: f64) -> Result<Array1<f64>>;
}

/// Float widths the kernels are generic over.
pub trait KdeFloat: Float + FloatConst + Send + Sync + Debug + 'static {
    const DATA_TYPE: DataType;

    fn from_f64(value: f64) -> Self;

    fn into_f64(self) -> f64;
}

impl KdeFloat for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn into_f64(self) -> f64 {
        f64::from(self)
    }
}

impl KdeFloat for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn from_f64(value: f64) -> Self {
        value
    }

    fn into_f64(self) -> f64 {
        self
    }
}

/// Which backend the process should use when a factor is not given one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Host evaluation (rayon-parallel).
    #[default]
    Cpu,
    /// wgpu compute evaluation, requires the `gpu_support` feature.
    Gpu,
}

/// Environment variable read by [`BackendKind::from_env`].
pub const BACKEND_ENV_VAR: &str = "PGM_FACTORS_BACKEND";

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(BackendKind::Cpu),
            "gpu" => Ok(BackendKind::Gpu),
            other => Err(format!("unknown backend '{other}', expected 'cpu' or 'gpu'")),
        }
    }
}

impl BackendKind {
    /// Read the backend from `PGM_FACTORS_BACKEND`, defaulting to the CPU.
    pub fn from_env() -> Self {
        match std::env::var(BACKEND_ENV_VAR) {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(%e, "ignoring {BACKEND_ENV_VAR}");
                BackendKind::Cpu
            }),
            Err(_) => BackendKind::Cpu,
        }
    }

    /// Construct the backend, falling back to the CPU when the GPU is unavailable.
    pub fn build(self) -> Arc<dyn ComputeBackend> {
        match self {
            BackendKind::Cpu => Arc::new(CpuBackend::new()),
            BackendKind::Gpu => gpu_or_cpu(),
        }
    }
}

#[cfg(feature = "gpu_support")]
fn gpu_or_cpu() -> Arc<dyn ComputeBackend> {
    match GpuBackend::new() {
        Ok(gpu) => Arc::new(gpu),
        Err(e) => {
            tracing::warn!(error = %e, "GPU backend unavailable, falling back to CPU");
            Arc::new(CpuBackend::new())
        }
    }
}

#[cfg(not(feature = "gpu_support"))]
fn gpu_or_cpu() -> Arc<dyn ComputeBackend> {
    tracing::warn!("built without gpu_support, falling back to CPU backend");
    Arc::new(CpuBackend::new())
}

/// Backend chosen by process configuration ([`BackendKind::from_env`]).
///
/// Built on first use and shared by every factor that is not given a backend.
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    static DEFAULT: OnceLock<Arc<dyn ComputeBackend>> = OnceLock::new();
    DEFAULT.get_or_init(|| BackendKind::from_env().build()).clone()
}

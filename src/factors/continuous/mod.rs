// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

// Continuous-variable factors and their bandwidth selectors

pub mod bandwidth;
mod product_kde;

pub use bandwidth::{BandwidthEstimator, NormalReferenceRule, ScottsBandwidth};
pub use product_kde::ProductKde;

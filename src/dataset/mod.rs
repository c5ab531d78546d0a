// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

// Columnar input tables consumed by factors: named float columns with null bitmaps

pub mod column;
pub mod frame;

pub use column::{Column, ColumnData, DataType};
pub use frame::DataFrame;

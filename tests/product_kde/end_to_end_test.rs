use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use rstest::rstest;

use pgm_factors::dataset::DataType;
use pgm_factors::factors::continuous::ProductKde;

use crate::test_helpers::{
    generate_normal_data, inject_all_nulls, normal_reference_bandwidth, null_positions, tolerance, valid_values,
};

#[rstest]
fn fit_and_evaluate_with_injected_nulls(#[values(DataType::Float64, DataType::Float32)] data_type: DataType) {
    let data = generate_normal_data(500, 0).cast(data_type);

    // Single variable: bandwidth against the reference rule.
    let mut single = ProductKde::new(&["a"]).unwrap();
    single.fit(&data).unwrap();
    let reference = normal_reference_bandwidth(&valid_values(&generate_normal_data(500, 0), "a"));
    assert_abs_diff_eq!(single.bandwidth()[0], reference, epsilon = tolerance(data_type));

    // Four variables with nulls at known indices.
    let train_nulls = null_positions(500, 100, 0);
    let train = inject_all_nulls(&data, &train_nulls);
    let mut kde = ProductKde::new(&["a", "b", "c", "d"]).unwrap();
    kde.fit(&train).unwrap();

    let incomplete: BTreeSet<usize> = train_nulls.iter().flatten().copied().collect();
    assert_eq!(kde.num_instances(), 500 - incomplete.len());

    // Disjoint 50-row query sample with nulls.
    let query_nulls = null_positions(50, 10, 1);
    let query = inject_all_nulls(&generate_normal_data(50, 1).cast(data_type), &query_nulls);
    let logl = kde.logl(&query).unwrap();

    let nan_rows: BTreeSet<usize> = query_nulls.iter().flatten().copied().collect();
    for (row, value) in logl.iter().enumerate() {
        assert_eq!(value.is_nan(), nan_rows.contains(&row), "row {row}");
        if !value.is_nan() {
            assert!(value.is_finite());
        }
    }

    let expected: f64 = logl.iter().filter(|v| !v.is_nan()).sum();
    assert_eq!(kde.slogl(&query).unwrap(), expected);
}

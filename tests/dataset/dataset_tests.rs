use ndarray::{Array2, array};

use pgm_factors::Error;
use pgm_factors::dataset::{Column, ColumnData, DataFrame, DataType};

#[test]
fn column_from_nan_marks_nulls() {
    let col = Column::from_nan_f64(array![1.0, f64::NAN, 3.0, f64::NAN]);
    assert_eq!(col.len(), 4);
    assert_eq!(col.null_count(), 2);
    assert!(col.is_valid(0));
    assert!(!col.is_valid(1));
    assert_eq!(col.validity_mask(), vec![true, false, true, false]);
    assert_eq!(col.non_null(), ColumnData::Float64(array![1.0, 3.0]));

    let dense = Column::from_nan_f32(array![1.0f32, 2.0]);
    assert_eq!(dense.null_count(), 0);
    assert!(dense.validity().is_none());
    assert_eq!(dense.data_type(), DataType::Float32);
}

#[test]
fn column_values_or_nan_fills_nulls() {
    let col = Column::with_validity(array![1.0f32, 2.0, 3.0], vec![true, false, true]).unwrap();
    let ColumnData::Float32(v) = col.values_or_nan() else {
        panic!("width changed");
    };
    assert_eq!(v[0], 1.0);
    assert!(v[1].is_nan());
    assert_eq!(v[2], 3.0);
}

#[test]
fn column_validity_length_is_checked() {
    let err = Column::with_validity(array![1.0, 2.0], vec![true]).unwrap_err();
    assert!(matches!(err, Error::ColumnLength { expected: 2, found: 1, .. }));
}

#[test]
fn cast_preserves_nulls() {
    let col = Column::from_nan_f64(array![0.5, f64::NAN, -1.25]);
    let cast = col.cast(DataType::Float32);
    assert_eq!(cast.data_type(), DataType::Float32);
    assert_eq!(cast.validity_mask(), vec![true, false, true]);
    assert_eq!(cast.non_null(), ColumnData::Float32(array![0.5f32, -1.25]));

    let back = cast.cast(DataType::Float64);
    assert_eq!(back.non_null(), ColumnData::Float64(array![0.5, -1.25]));
}

#[test]
fn frame_lookup_by_name() {
    let df = DataFrame::new()
        .with_column("x", Column::new(array![1.0, 2.0, 3.0]))
        .unwrap()
        .with_column("y", Column::new(array![4.0, 5.0, 6.0]))
        .unwrap();

    assert_eq!(df.num_rows(), 3);
    assert_eq!(df.num_columns(), 2);
    assert_eq!(df.column_names(), &["x".to_string(), "y".to_string()]);
    assert!(df.has_column("y"));
    assert!(matches!(df.column("z"), Err(Error::MissingColumn(name)) if name == "z"));
}

#[test]
fn frame_rejects_bad_columns() {
    let mut df = DataFrame::new();
    df.add_column("x", Column::new(array![1.0, 2.0])).unwrap();

    let err = df.add_column("x", Column::new(array![3.0, 4.0])).unwrap_err();
    assert!(matches!(err, Error::DuplicateColumn(_)));

    let err = df.add_column("y", Column::new(array![3.0])).unwrap_err();
    assert!(matches!(err, Error::ColumnLength { expected: 2, found: 1, .. }));
}

#[test]
fn combined_validity_is_logical_and() {
    let df = DataFrame::new()
        .with_column("x", Column::from_nan_f64(array![1.0, f64::NAN, 3.0, 4.0]))
        .unwrap()
        .with_column("y", Column::from_nan_f64(array![1.0, 2.0, f64::NAN, 4.0]))
        .unwrap()
        .with_column("z", Column::from_nan_f64(array![f64::NAN, 2.0, 3.0, 4.0]))
        .unwrap();

    assert_eq!(df.combined_validity(&["x", "y"]).unwrap(), vec![true, false, false, true]);
    assert_eq!(df.valid_rows(&["x", "y"]).unwrap(), 2);
    assert_eq!(df.valid_rows(&["x", "y", "z"]).unwrap(), 1);
    assert_eq!(df.valid_rows(&["y"]).unwrap(), 3);
}

#[test]
fn from_array2_converts_nan() {
    let data: Array2<f64> = array![[1.0, 2.0], [f64::NAN, 3.0], [4.0, 5.0]];
    let df = DataFrame::from_array2(&["p", "q"], data).unwrap();
    assert_eq!(df.num_rows(), 3);
    assert_eq!(df.column("p").unwrap().null_count(), 1);
    assert_eq!(df.column("q").unwrap().null_count(), 0);

    let err = DataFrame::from_array2(&["p"], array![[1.0, 2.0]]).unwrap_err();
    assert!(matches!(err, Error::ColumnLength { .. }));
}

#[test]
fn select_rows_and_head() {
    let df = DataFrame::new()
        .with_column("x", Column::from_nan_f64(array![1.0, f64::NAN, 3.0, 4.0]))
        .unwrap();

    let picked = df.select_rows(&[false, true, true, false]).unwrap();
    assert_eq!(picked.num_rows(), 2);
    assert_eq!(picked.column("x").unwrap().validity_mask(), vec![false, true]);

    let head = df.head(3);
    assert_eq!(head.num_rows(), 3);
    assert_eq!(head.column("x").unwrap().null_count(), 1);
    assert_eq!(df.head(10).num_rows(), 4);

    assert!(df.select_rows(&[true]).is_err());
}

#[test]
fn frame_cast_changes_every_column() {
    let df = DataFrame::new()
        .with_column("x", Column::new(array![1.0, 2.0]))
        .unwrap()
        .with_column("y", Column::new(array![3.0f32, 4.0]))
        .unwrap();

    let f32_df = df.to_float32();
    assert!(f32_df.column_names().iter().all(|n| f32_df.column(n).unwrap().data_type() == DataType::Float32));
    let f64_df = df.to_float64();
    assert!(f64_df.column_names().iter().all(|n| f64_df.column(n).unwrap().data_type() == DataType::Float64));
}

#[test]
fn rows_past_the_end_are_not_valid() {
    let dense = Column::new(array![1.0, 2.0]);
    assert!(dense.is_valid(1));
    assert!(!dense.is_valid(2));

    let sparse = Column::from_nan_f64(array![1.0, f64::NAN]);
    assert!(!sparse.is_valid(1));
    assert!(!sparse.is_valid(5));
}

#[test]
fn data_type_names_carry_width() {
    assert_eq!(DataType::Float32.to_string(), "float32");
    assert_eq!(DataType::Float64.to_string(), "float64");

    let err = Error::DataTypeMismatch { expected: DataType::Float64, found: DataType::Float32 };
    assert!(err.to_string().contains("fitted with float64, got float32"));
}

use approx::assert_relative_eq;
use ndarray::{Array1, array};
use rstest::rstest;

use pgm_factors::factors::continuous::bandwidth::{sample_covariance, sample_std};
use pgm_factors::factors::continuous::{BandwidthEstimator, NormalReferenceRule, ScottsBandwidth};

use crate::test_helpers::{generate_normal_data, normal_reference_bandwidth, scott_bandwidth, valid_values};

#[test]
fn sample_std_uses_unbiased_divisor() {
    let v = array![1.0, 2.0, 3.0, 4.0];
    assert_relative_eq!(sample_std(v.view()), (5.0f64 / 3.0).sqrt(), epsilon = 1e-15);
    assert!(sample_std(array![1.0].view()).is_nan());
    assert!(sample_std(Array1::<f64>::zeros(0).view()).is_nan());
}

#[test]
fn normal_reference_rule_univariate() {
    let v = array![0.2, -1.3, 0.7, 2.4, 1.1, -0.6, 0.05];
    let n = v.len() as f64;
    let expected = (4.0f64 / 3.0).powf(0.2) * n.powf(-0.2) * sample_std(v.view());
    assert_relative_eq!(
        NormalReferenceRule.estimate_univariate("x", v.view()),
        expected,
        epsilon = 1e-14
    );
}

#[test]
fn scotts_rule_univariate() {
    let v = array![0.2, -1.3, 0.7, 2.4, 1.1, -0.6, 0.05];
    let n = v.len() as f64;
    let expected = n.powf(-0.2) * sample_std(v.view());
    assert_relative_eq!(ScottsBandwidth.estimate_univariate("x", v.view()), expected, epsilon = 1e-14);
}

#[rstest]
fn rules_match_reference_on_generated_data(#[values("a", "b", "c", "d")] variable: &str) {
    let df = generate_normal_data(500, 0);
    let values = valid_values(&df, variable);
    let view = Array1::from(values.clone());

    assert_relative_eq!(
        NormalReferenceRule.estimate_univariate(variable, view.view()),
        normal_reference_bandwidth(&values),
        max_relative = 1e-12
    );
    assert_relative_eq!(
        ScottsBandwidth.estimate_univariate(variable, view.view()),
        scott_bandwidth(&values),
        max_relative = 1e-12
    );
}

#[test]
fn multivariate_one_dimension_is_squared_univariate() {
    let v = array![0.2, -1.3, 0.7, 2.4, 1.1, -0.6, 0.05];
    let rows = v.clone().insert_axis(ndarray::Axis(1));
    let names = vec!["x".to_string()];

    let h = NormalReferenceRule.estimate_univariate("x", v.view());
    let cov = NormalReferenceRule.estimate_multivariate(&names, rows.view());
    assert_eq!(cov.dim(), (1, 1));
    assert_relative_eq!(cov[[0, 0]], h * h, max_relative = 1e-12);

    let h = ScottsBandwidth.estimate_univariate("x", v.view());
    let cov = ScottsBandwidth.estimate_multivariate(&names, rows.view());
    assert_relative_eq!(cov[[0, 0]], h * h, max_relative = 1e-12);
}

#[test]
fn multivariate_scales_covariance() {
    let rows = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0], [0.5, 0.0]];
    let names = vec!["x".to_string(), "y".to_string()];
    let cov = sample_covariance(rows.view());
    assert_relative_eq!(cov[[0, 1]], cov[[1, 0]], epsilon = 1e-15);

    let n = 5.0f64;
    let scott = n.powf(-1.0 / 6.0).powi(2);
    let h = ScottsBandwidth.estimate_multivariate(&names, rows.view());
    for i in 0..2 {
        for j in 0..2 {
            assert_relative_eq!(h[[i, j]], scott * cov[[i, j]], max_relative = 1e-12);
        }
    }

    let normal = ((4.0f64 / 4.0).powf(1.0 / 6.0) * n.powf(-1.0 / 6.0)).powi(2);
    let h = NormalReferenceRule.estimate_multivariate(&names, rows.view());
    assert_relative_eq!(h[[0, 0]], normal * cov[[0, 0]], max_relative = 1e-12);
}

#[test]
fn covariance_of_known_sample() {
    let rows = array![[1.0, 2.0], [3.0, 6.0]];
    let cov = sample_covariance(rows.view());
    assert_relative_eq!(cov[[0, 0]], 2.0, epsilon = 1e-15);
    assert_relative_eq!(cov[[1, 1]], 8.0, epsilon = 1e-15);
    assert_relative_eq!(cov[[0, 1]], 4.0, epsilon = 1e-15);

    let single = array![[1.0, 2.0]];
    assert!(sample_covariance(single.view()).iter().all(|v| v.is_nan()));
}

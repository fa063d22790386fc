use approx::assert_relative_eq;
use rstest::rstest;
use series_math::stats::{min_max_scale, outlier_fence, quartiles, TUKEY_FENCE};
use series_math::MathError;

fn skewed_sample() -> Vec<f64> {
    vec![0.01, 0.02, 0.02, 0.03, 0.05, 0.04, 0.03, 0.02, 0.9, 0.01, 0.06, 0.04]
}

#[test]
fn test_quartiles_are_ordered() {
    let q = quartiles(&skewed_sample()).unwrap();

    assert!(q.q1 <= q.q3);
    assert!(q.iqr() >= 0.0);
    assert_relative_eq!(q.upper_fence(0.0), q.q3);
}

#[test]
fn test_fence_isolates_extreme_value() {
    let sample = skewed_sample();
    let fence = outlier_fence(&sample, TUKEY_FENCE).unwrap();

    let outliers: Vec<f64> = sample.iter().copied().filter(|v| *v > fence).collect();
    assert_eq!(outliers, vec![0.9]);
}

#[rstest]
#[case(0.5, 1.0)]
#[case(1.0, 1.5)]
#[case(1.5, 3.0)]
#[case(3.0, 10.0)]
fn test_fence_is_monotonic_in_multiplier(#[case] smaller: f64, #[case] larger: f64) {
    let sample = skewed_sample();

    let low = outlier_fence(&sample, smaller).unwrap();
    let high = outlier_fence(&sample, larger).unwrap();
    assert!(high >= low);

    let count = |fence: f64| sample.iter().filter(|v| **v > fence).count();
    assert!(count(high) <= count(low));
}

#[test]
fn test_negative_multiplier_rejected() {
    let result = outlier_fence(&skewed_sample(), -1.0);
    assert!(matches!(result, Err(MathError::InvalidInput(_))));
}

#[test]
fn test_non_finite_values_rejected() {
    let result = quartiles(&[1.0, f64::NAN, 2.0]);
    assert!(matches!(result, Err(MathError::CalculationError(_))));
}

#[test]
fn test_min_max_scale_bounds() {
    let scaled = min_max_scale(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();

    assert_eq!(scaled[0], 0.0);
    assert_eq!(scaled[4], 1.0);
    assert_relative_eq!(scaled[2], 0.5);
}

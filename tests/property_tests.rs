//! Property-based tests for the diagnostics.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated series.

use proptest::prelude::*;
use ts_stat_tests::correlation::{acf, AcfConfig};
use ts_stat_tests::regularity::{sample_entropy, spectral_entropy, Metric};
use ts_stat_tests::seasonality::{compute, qs, QsConfig};
use ts_stat_tests::stability::{lumpiness, stability};
use ts_stat_tests::utils::stats::chi2_sf;
use ts_stat_tests::StatTestError;

/// Strategy for generating valid series values.
/// Adds a small ramp so that no series is constant.
fn valid_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        prop::collection::vec(1.0..1000.0_f64, len).prop_map(|mut v| {
            for (i, val) in v.iter_mut().enumerate() {
                *val += (i as f64) * 0.001;
            }
            v
        })
    })
}

/// Strategy for an alternating series `±10` with bounded noise.
fn alternating_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0..1.0_f64, min_len..max_len).prop_map(|noise| {
        noise
            .iter()
            .enumerate()
            .map(|(t, e)| if t % 2 == 0 { 10.0 + e } else { -10.0 + e })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn small_frequency_rejected(values in valid_values_strategy(10, 60), freq in 0usize..2) {
        let err = qs(&values, freq, &QsConfig::default()).unwrap_err();
        prop_assert!(matches!(err, StatTestError::InvalidInput(_)));
    }

    #[test]
    fn p_value_in_unit_interval(values in valid_values_strategy(30, 120), freq in 2usize..8) {
        let result = qs(&values, freq, &QsConfig::default()).unwrap();
        prop_assert!(result.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&result.p_value));
        prop_assert_eq!(result.test, "QS");
    }

    #[test]
    fn negative_seasonal_correlation_clamps(values in alternating_strategy(40, 100), freq in prop::sample::select(vec![3usize, 5, 7])) {
        // Odd lags of an alternating series are negative
        let result = qs(&values, freq, &QsConfig::default().with_diff(false)).unwrap();
        prop_assert_eq!(result.statistic, 0.0);
        prop_assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn p_value_decreases_with_statistic(a in 0.0..200.0_f64, b in 0.0..200.0_f64) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(chi2_sf(lo, 2).unwrap() >= chi2_sf(hi, 2).unwrap());
    }

    #[test]
    fn qs_is_deterministic(values in valid_values_strategy(30, 90), freq in 2usize..6) {
        let first = qs(&values, freq, &QsConfig::default()).unwrap();
        let second = qs(&values, freq, &QsConfig::default()).unwrap();
        prop_assert_eq!(first.statistic, second.statistic);
        prop_assert_eq!(first.p_value, second.p_value);
    }

    #[test]
    fn qs_is_shift_invariant(values in valid_values_strategy(30, 90), shift in -500.0..500.0_f64) {
        let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();
        let a = compute(&values, 4, None).unwrap().statistic;
        let b = compute(&shifted, 4, None).unwrap().statistic;
        prop_assert!((a - b).abs() <= 1e-6 * (1.0 + a.abs()));
    }

    #[test]
    fn acf_is_bounded(values in valid_values_strategy(20, 100)) {
        let result = acf(&values, &AcfConfig::default()).unwrap();
        prop_assert!((result.acf[0] - 1.0).abs() < 1e-12);
        for r in &result.acf {
            prop_assert!(r.abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn sample_entropy_non_negative(values in valid_values_strategy(10, 60)) {
        let value = sample_entropy(&values, 2, Metric::Chebyshev).unwrap();
        prop_assert!(value >= 0.0);
    }

    #[test]
    fn normalized_spectral_entropy_in_unit_interval(values in valid_values_strategy(8, 100)) {
        let value = spectral_entropy(&values, 1.0, true).unwrap();
        prop_assert!((0.0..=1.0 + 1e-12).contains(&value));
    }

    #[test]
    fn stability_and_lumpiness_non_negative(values in valid_values_strategy(10, 100), freq in 1usize..13) {
        prop_assert!(stability(&values, freq).unwrap() >= 0.0);
        prop_assert!(lumpiness(&values, freq).unwrap() >= 0.0);
    }
}

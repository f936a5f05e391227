//! End-to-end anomaly scenarios on small synthetic cubes.

use climate_common::GriddedField;
use grid_processor::{
    compute_statistics, ensemble_mean, standardized_anomaly, AnomalyEngine, GridProcessorConfig,
    MissingPolicy, ZeroVariancePolicy,
};
use test_utils::{active_window, assert_approx_eq, offset_cube};

/// Two 2x2x10 cubes whose values jump by a constant offset during steps
/// 3..6. For a cell with background `b`, offset `d` and `k` active steps
/// out of `n`:
///
/// mean        = b + d * k / n
/// active mean = b + d
/// std         = d * sqrt(p * (1 - p)),  p = k / n
///
/// so the standardized anomaly is `(1 - p) / sqrt(p * (1 - p))` everywhere.
#[test]
fn test_constant_offset_matches_analytic_value() {
    let active = active_window(10, 3, 6);
    let p: f64 = 3.0 / 10.0;
    let expected = (1.0 - p) / (p * (1.0 - p)).sqrt();

    for (name, offset) in [("r1", 2.0), ("r2", -4.0)] {
        let cube = offset_cube(name, 2, 2, &active, offset);
        let stats = compute_statistics(&cube, &active).unwrap();
        let anomaly = standardized_anomaly(&cube, &stats, ZeroVariancePolicy::Fail).unwrap();

        let sign = offset.signum();
        for value in anomaly.data.iter() {
            assert_approx_eq!(*value, sign * expected, 1e-9);
        }
        assert_eq!(stats.active_steps, 3);
    }
}

#[test]
fn test_engine_derives_mask_from_aod() {
    let active = active_window(10, 3, 6);
    let aod: Vec<f64> = active.iter().map(|&a| if a { 0.4 } else { 0.01 }).collect();
    let cube = offset_cube("r1", 2, 2, &active, 1.5);

    let engine = AnomalyEngine::new(GridProcessorConfig::default());
    let result = engine.process(&cube, &aod).unwrap();

    let p: f64 = 0.3;
    let expected = (1.0 - p) / (p * (1.0 - p)).sqrt();
    assert_approx_eq!(result.anomaly.data[[1, 0]], expected, 1e-9);
    assert_eq!(result.anomaly.name, "r1_std_anomaly");
    assert_eq!(result.anomaly.lon, cube.lon);
}

#[test]
fn test_ensemble_of_identical_fields_is_exact() {
    let active = active_window(10, 2, 4);
    let cube = offset_cube("r1", 2, 2, &active, 0.7);
    let twin: GriddedField = cube.clone();

    for policy in [MissingPolicy::Skip, MissingPolicy::Propagate] {
        let mean = ensemble_mean(&[&cube, &twin], policy).unwrap();
        assert_eq!(mean.data, cube.data);
    }
}

//! The native backend recovers a planted spatial mode end to end.

use eof_pipeline::{EofArtifacts, EofConfig, EofPipeline, NativeBackend};
use grid_processor::GridProcessorConfig;
use test_utils::{field_from_fn, lcg_noise, sine_series};

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let ma = a.iter().sum::<f64>() / n;
    let mb = b.iter().sum::<f64>() / n;
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    cov / (va * vb).sqrt()
}

#[test]
fn test_native_backend_recovers_planted_mode() {
    let dir = tempfile::tempdir().unwrap();
    let (nlon, nlat, ntime) = (6, 4, 60);

    let signal = sine_series(ntime, 12.0, 1.0);
    let noise = lcg_noise(ntime * nlat * nlon, 7, 0.02);
    let pattern = |j: usize, i: usize| 1.0 + 0.5 * j as f64 + 0.25 * i as f64;

    let run = field_from_fn("tas", nlon, nlat, ntime, |t, j, i| {
        285.0 + pattern(j, i) * signal[t] + noise[(t * nlat + j) * nlon + i]
    });

    let config = EofConfig {
        modes: 3,
        latitude_bound: 90.0,
        standardize: false,
        area_weighted: false,
        cache_dir: dir.path().to_path_buf(),
    };
    let pipeline = EofPipeline::new(
        config,
        GridProcessorConfig::default(),
        NativeBackend::new(false),
    );
    let result = pipeline.run(&[&run]).unwrap();
    assert_eq!(result.manifest.backend, "native");
    assert_eq!(result.manifest.modes(), 3);

    let artifacts = EofArtifacts::load(&result.dir, &result.manifest).unwrap();
    assert_eq!(artifacts.modes(), 3);

    let explained = artifacts.explained_variance();
    assert!(explained[0] > 0.95, "first mode explains {}", explained[0]);
    assert!(explained[0] > explained[1]);

    let pc1 = artifacts.coefficient(1).unwrap();
    assert_eq!(pc1.values.len(), ntime);
    let r = pearson(&pc1.values, &signal);
    assert!(r.abs() > 0.99, "pc1 correlates {r} with the planted series");

    // Sign normalized so the largest pattern component is positive; the
    // planted pattern is all positive, so the coefficient follows it.
    let eof1 = artifacts.pattern(1).unwrap();
    assert!(eof1.data.iter().all(|v| *v > 0.0));
    assert!(r > 0.0);

    assert!(artifacts.pattern(4).is_none());
    assert!(artifacts.coefficient(0).is_none());
}

#[test]
fn test_native_results_are_reused_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let run = field_from_fn("tas", 3, 2, 10, |t, j, i| {
        (t as f64 * 0.9).sin() * (1.0 + j as f64) + 0.1 * i as f64
    });
    let config = EofConfig {
        modes: 2,
        latitude_bound: 90.0,
        cache_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let pipeline = EofPipeline::new(config, GridProcessorConfig::default(), NativeBackend::default());

    let first = pipeline.run(&[&run]).unwrap();
    let second = pipeline.run(&[&run]).unwrap();
    assert!(!first.reused);
    assert!(second.reused);

    let a = EofArtifacts::load(&first.dir, &first.manifest).unwrap();
    let b = EofArtifacts::load(&second.dir, &second.manifest).unwrap();
    assert_eq!(a.eigenvalues, b.eigenvalues);
}
